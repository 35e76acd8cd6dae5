//! Corpus directory listing: discovery, ordering and resume selection
//!
//! Bulk files are named `PMC<start>_PMC<end>.xml.gz`, the numeric range
//! giving both the processing order and the resume key.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use regex::Regex;
use synmine_core::{FetchError, HttpClient, RetryPolicy, retry_with_backoff};

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="([^"]+\.xml\.gz)""#).expect("invalid anchor pattern")
});

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PMC(\d+)_PMC(\d+)").expect("invalid range pattern"));

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PMC(\d+)$").expect("invalid marker pattern"));

/// One remotely hosted corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFileEntry {
    pub url: String,
    pub filename: String,
    pub range_start: u64,
    pub range_end: u64,
}

/// Fetch the listing at `base_url` and parse it into sorted entries.
///
/// Transient failures are retried per the client's policy; an unreachable
/// listing is an error.
pub fn fetch_listing(client: &HttpClient, base_url: &str) -> Result<Vec<CorpusFileEntry>> {
    log::info!("Fetching directory listing from {base_url}...");
    let policy = RetryPolicy::from(client.config());
    let html = retry_with_backoff("listing", &ProgressBar::hidden(), &policy, || {
        client.get_text(base_url).map_err(FetchError::from)
    })
    .with_context(|| format!("Failed to fetch directory listing {base_url}"))?;

    let entries = parse_listing(&html, base_url);
    log::info!("Found {} corpus files in listing", entries.len());
    Ok(entries)
}

/// Parse anchors to `*.xml.gz` files carrying a `PMC<start>_PMC<end>` range.
///
/// Anchors without a range are ignored. Sorted ascending by range start.
pub fn parse_listing(html: &str, base_url: &str) -> Vec<CorpusFileEntry> {
    let mut entries = Vec::new();

    // Anchors look like: <a href="PMC000xxxxxx_PMC001xxxxxx.xml.gz">...</a>
    for caps in ANCHOR.captures_iter(html) {
        let filename = &caps[1];
        let Some((range_start, range_end)) = parse_range(filename) else {
            continue;
        };
        entries.push(CorpusFileEntry {
            url: format!("{}/{}", base_url.trim_end_matches('/'), filename),
            filename: filename.to_string(),
            range_start,
            range_end,
        });
    }

    entries.sort_by_key(|e| e.range_start);
    entries
}

/// `PMC11890001_PMC11900000.xml.gz` → `(11890001, 11900000)`
pub fn parse_range(name: &str) -> Option<(u64, u64)> {
    let caps = RANGE.captures(name)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Numeric value of a resume marker: `PMC123`, or the range start of a filename
pub fn marker_number(marker: &str) -> Option<u64> {
    if let Some((start, _)) = parse_range(marker) {
        return Some(start);
    }
    MARKER.captures(marker.trim())?[1].parse().ok()
}

/// Apply the start point, then the file cap.
///
/// `start_from` selects the first entry whose range start is at or above the
/// marker's number; a marker past every entry selects nothing. A marker that
/// is not a range is matched as an exact filename, falling back to the
/// beginning when absent.
pub fn select_entries(
    entries: Vec<CorpusFileEntry>,
    start_from: Option<&str>,
    max_files: Option<usize>,
) -> Vec<CorpusFileEntry> {
    let mut selected = entries;

    if let Some(marker) = start_from {
        let skip = match marker_number(marker) {
            Some(start) => {
                let idx = selected.iter().position(|e| e.range_start >= start);
                if idx.is_none() {
                    log::warn!("Could not find file with PMC ID >= {start}");
                }
                idx.unwrap_or(selected.len())
            }
            None => match selected.iter().position(|e| e.filename == marker) {
                Some(idx) => idx,
                None => {
                    log::warn!("Start file {marker} not found, starting from beginning");
                    0
                }
            },
        };
        selected.drain(..skip);
        if let Some(first) = selected.first() {
            log::info!("Starting from file: {}", first.filename);
        }
    }

    if let Some(limit) = max_files {
        selected.truncate(limit);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
<html>
<head><title>Index of /pub/databases/pmc/oa</title></head>
<body>
<pre>Name                                Last modified      Size
<a href="PMC011xxxxxx_PMC011xxxxxx.txt">readme</a>
<a href="PMC11900001_PMC11910000.xml.gz">PMC11900001_PMC11910000.xml.gz</a>   2024-03-01 10:00  1.5G
<a href="PMC11890001_PMC11900000.xml.gz">PMC11890001_PMC11900000.xml.gz</a>   2024-03-01 10:00  912M
<a href="oa_comm_xml.incr.xml.gz">oa_comm_xml.incr.xml.gz</a>
<a href="PMC11910001_PMC11920000.xml.gz">PMC11910001_PMC11920000.xml.gz</a>
</pre>
</body>
</html>"#;

    fn entries() -> Vec<CorpusFileEntry> {
        parse_listing(SAMPLE_HTML, "https://europepmc.org/ftp/oa/")
    }

    fn names(entries: &[CorpusFileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.filename.as_str()).collect()
    }

    #[test]
    fn parse_sorted_by_range() {
        let entries = entries();
        assert_eq!(
            names(&entries),
            vec![
                "PMC11890001_PMC11900000.xml.gz",
                "PMC11900001_PMC11910000.xml.gz",
                "PMC11910001_PMC11920000.xml.gz",
            ]
        );
        assert_eq!(entries[0].range_start, 11_890_001);
        assert_eq!(entries[0].range_end, 11_900_000);
        assert_eq!(
            entries[0].url,
            "https://europepmc.org/ftp/oa/PMC11890001_PMC11900000.xml.gz"
        );
    }

    #[test]
    fn anchors_parse_without_size_columns() {
        let html = r#"<a href="PMC3_PMC4.xml.gz">x</a><a href="PMC1_PMC2.xml.gz">y</a>"#;
        let entries = parse_listing(html, "http://host/oa");
        assert_eq!(names(&entries), vec!["PMC1_PMC2.xml.gz", "PMC3_PMC4.xml.gz"]);
        assert_eq!(entries[1].url, "http://host/oa/PMC3_PMC4.xml.gz");
    }

    #[test]
    fn select_from_range_marker() {
        let selected = select_entries(entries(), Some("PMC11900001_PMC11910000.xml.gz"), None);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].range_start, 11_900_001);
    }

    #[test]
    fn select_from_bare_marker_between_ranges() {
        let selected = select_entries(entries(), Some("PMC11895000"), None);
        assert_eq!(selected[0].range_start, 11_900_001);
    }

    #[test]
    fn select_past_last_file_is_empty() {
        assert!(select_entries(entries(), Some("PMC99999999"), None).is_empty());
    }

    #[test]
    fn unknown_filename_starts_from_beginning() {
        let selected = select_entries(entries(), Some("missing.xml.gz"), Some(2));
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].range_start, 11_890_001);
    }

    #[test]
    fn cap_applies_after_start() {
        let selected = select_entries(entries(), Some("PMC11890001"), Some(1));
        assert_eq!(names(&selected), vec!["PMC11890001_PMC11900000.xml.gz"]);
    }

    #[test]
    fn marker_numbers() {
        assert_eq!(marker_number("PMC123"), Some(123));
        assert_eq!(marker_number("PMC1_PMC2.xml.gz"), Some(1));
        assert_eq!(marker_number("pmc123"), None);
        assert_eq!(marker_number("nonsense"), None);
    }
}
