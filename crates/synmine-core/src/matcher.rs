//! Synapse identifier matching with bounded context windows
//!
//! An identifier is `syn` (ASCII, any case) followed by 7-12 ASCII digits, where the
//! digit run is not part of a longer number on either side. The `regex` crate
//! has no look-around, so the candidate pattern captures the whole digit run
//! and the boundary rules are checked explicitly.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

/// Default number of characters captured on each side of a match
pub const DEFAULT_CONTEXT_SIZE: usize = 100;

/// Rendered contexts shorter than this are treated as clipping artifacts
pub const MIN_CONTEXT_LEN: usize = 10;

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 12;

/// `syn` followed by the complete run of digits after it.
///
/// Case folding is ASCII-only; Unicode folding would accept `ſ` (U+017F) for `s`.
static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)syn([0-9]+)").expect("invalid identifier pattern"));

/// Matcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Characters of context kept before and after each match
    pub context_size: usize,
    /// Keep only the first occurrence of each identifier per document
    pub dedup: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            context_size: DEFAULT_CONTEXT_SIZE,
            dedup: true,
        }
    }
}

/// One identifier occurrence within a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Lowercased identifier, e.g. `syn1234567`
    pub identifier: String,
    /// Character offset of the match start
    pub position: usize,
    pub context_before: String,
    pub context_after: String,
    /// Contiguous source window around the match, trimmed
    pub full_context: String,
}

/// Scans text for Synapse identifiers.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find all identifiers in `text`, in left-to-right order.
    pub fn find(&self, text: &str) -> Vec<Match> {
        let mut matches = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        // Running (byte, char) offset so positions stay linear in text size
        let mut cursor = (0usize, 0usize);

        for caps in CANDIDATE.captures_iter(text) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
                continue;
            }
            if preceded_by_digit(text, whole.start()) {
                continue;
            }

            let identifier = whole.as_str().to_ascii_lowercase();
            if !is_synapse_id(&identifier) {
                continue;
            }
            if self.config.dedup && seen.contains(&identifier) {
                continue;
            }

            let position = cursor.1 + text[cursor.0..whole.start()].chars().count();
            cursor = (whole.start(), position);

            let Some(m) = render(
                text,
                whole.start(),
                whole.end(),
                &identifier,
                position,
                self.config.context_size,
            ) else {
                log::trace!("dropping {identifier} at {position}: context failed sanity check");
                continue;
            };

            if self.config.dedup {
                seen.insert(identifier);
            }
            matches.push(m);
        }

        matches
    }
}

/// Check whether `s` is a well-formed identifier (`syn` + 7-12 digits, lowercase).
pub fn is_synapse_id(s: &str) -> bool {
    s.strip_prefix("syn").is_some_and(|digits| {
        (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Replace double quotes so contexts embed cleanly in tabular output
pub fn normalize_quotes(s: &str) -> String {
    s.replace('"', "'")
}

fn preceded_by_digit(text: &str, start: usize) -> bool {
    start > 0 && text.as_bytes()[start - 1].is_ascii_digit()
}

/// Byte offset of the window start `n` characters before `end`
fn window_start(text: &str, end: usize, n: usize) -> usize {
    if n == 0 {
        return end;
    }
    text[..end]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset of the window end `n` characters after `start`
fn window_end(text: &str, start: usize, n: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(i, _)| start + i)
}

fn render(
    text: &str,
    start: usize,
    end: usize,
    identifier: &str,
    position: usize,
    context_size: usize,
) -> Option<Match> {
    let ctx_start = window_start(text, start, context_size);
    let ctx_end = window_end(text, end, context_size);

    let full = normalize_quotes(text[ctx_start..ctx_end].trim());
    if full.chars().count() < MIN_CONTEXT_LEN || !full.to_ascii_lowercase().contains(identifier) {
        return None;
    }

    Some(Match {
        identifier: identifier.to_string(),
        position,
        context_before: normalize_quotes(text[ctx_start..start].trim()),
        context_after: normalize_quotes(text[end..ctx_end].trim()),
        full_context: full,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TEXT: &str = "
This is a test article that mentions a Synapse ID syn1234567 in the text.
There is also another Synapse ID syn9876543 mentioned here.
And one more syn1111111 for good measure.

Some IDs that should not match:
syn123 (too short)
syn12345678901234 (too long)
xyn1234567 (wrong prefix)
";

    fn ids(matches: &[Match]) -> Vec<&str> {
        matches.iter().map(|m| m.identifier.as_str()).collect()
    }

    fn matcher(context_size: usize, dedup: bool) -> Matcher {
        Matcher::new(MatchConfig { context_size, dedup })
    }

    #[test]
    fn finds_valid_ids_only() {
        let found = matcher(20, true).find(SAMPLE_TEXT);
        assert_eq!(ids(&found), vec!["syn1234567", "syn9876543", "syn1111111"]);
        for m in &found {
            assert!(m.full_context.contains(&m.identifier));
            assert!(m.context_before.chars().count() <= 20);
            assert!(m.context_after.chars().count() <= 20);
        }
    }

    #[test]
    fn digit_length_bounds() {
        let m = matcher(20, false);
        let text = |digits: &str| format!("dataset at syn{digits} was used here");
        assert!(m.find(&text("123456")).is_empty());
        assert_eq!(m.find(&text("1234567")).len(), 1);
        assert_eq!(m.find(&text("123456789012")).len(), 1);
        assert!(m.find(&text("1234567890123")).is_empty());
    }

    #[test]
    fn rejects_digit_before_prefix() {
        let found = matcher(20, false).find("reference code 9syn1234567 is not an id");
        assert!(found.is_empty());
    }

    #[test]
    fn lowercases_identifier() {
        let found = matcher(20, false).find("data deposited at SYN1234567 on Synapse");
        assert_eq!(ids(&found), vec!["syn1234567"]);
        assert!(found[0].full_context.contains("SYN1234567"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let text = "Here is syn1234567 mentioned once. Here is syn1234567 again. Also syn9876543 here.";
        let deduped = matcher(100, true).find(text);
        assert_eq!(ids(&deduped), vec!["syn1234567", "syn9876543"]);

        let all = matcher(100, false).find(text);
        assert_eq!(ids(&all), vec!["syn1234567", "syn1234567", "syn9876543"]);
        assert!(all[0].position < all[1].position);
        assert_eq!(deduped[0].position, all[0].position);
    }

    #[test]
    fn end_to_end_dedup_scenario() {
        let text = "... syn1234567 ... syn1234567 ... syn9876543 ...";
        let found = matcher(20, true).find(text);
        assert_eq!(ids(&found), vec!["syn1234567", "syn9876543"]);
    }

    #[test]
    fn context_grows_with_size() {
        let small = matcher(10, true).find(SAMPLE_TEXT);
        let large = matcher(50, true).find(SAMPLE_TEXT);
        assert_eq!(small.len(), large.len());
        for (s, l) in small.iter().zip(&large) {
            assert!(s.full_context.len() <= l.full_context.len());
        }
    }

    #[test]
    fn context_length_bounded() {
        let size = 15;
        for m in matcher(size, false).find(SAMPLE_TEXT) {
            let bound = 2 * size + m.identifier.len();
            assert!(m.full_context.chars().count() <= bound);
        }
    }

    #[test]
    fn quotes_normalized() {
        let found = matcher(30, true).find(r#"the table "syn1234567" holds counts"#);
        assert_eq!(found.len(), 1);
        assert!(!found[0].full_context.contains('"'));
        assert!(found[0].full_context.contains("'syn1234567'"));
    }

    #[test]
    fn positions_are_char_offsets() {
        let text = "été ééé syn1234567 fin du texte";
        let found = matcher(5, true).find(text);
        assert_eq!(found.len(), 1);
        let expected = text.chars().take_while(|c| *c != 's').count();
        assert_eq!(found[0].position, expected);
        assert_eq!(found[0].context_before, "ééé");
    }

    #[test]
    fn zero_context_still_needs_min_length() {
        // identifier alone is exactly 10 characters
        let found = matcher(0, true).find("x syn1234567 y");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_context, "syn1234567");
    }

    #[test]
    fn is_synapse_id_validation() {
        assert!(is_synapse_id("syn1234567"));
        assert!(is_synapse_id("syn123456789012"));
        assert!(!is_synapse_id("syn123456"));
        assert!(!is_synapse_id("syn1234567890123"));
        assert!(!is_synapse_id("SYN1234567"));
        assert!(!is_synapse_id("syn12345a7"));
    }

    #[test]
    fn ignores_non_ascii_case_folds() {
        let text = "data deposited at \u{017F}yn1234567 here for review, \
                    also at SYN7654321 and \u{017F}YN2222222";
        let found = matcher(20, false).find(text);
        assert!(found.iter().all(|m| is_synapse_id(&m.identifier)));
        assert_eq!(ids(&found), vec!["syn7654321"]);
    }
}
