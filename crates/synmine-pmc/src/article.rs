//! Per-article identifier extraction from PMC (JATS) XML fragments
//!
//! A fragment is parsed into a small element tree with quick-xml, the PMC id
//! is located, and the text of the title, abstract, body and back matter is
//! scanned for identifiers. Any failure is contained to the one article.

use std::borrow::Cow;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use synmine_core::{Finding, MatchConfig, Matcher};

/// Characters of context kept on each side of a match inside an article
pub const ARTICLE_CONTEXT_SIZE: usize = 25;

/// Registry prefix for exported document ids (`pmc:PMC1234567`)
pub const PMC_NAMESPACE: &str = "pmc";

/// `pub-id-type` values that carry the PMC id
const PMC_ID_TYPES: [&str; 2] = ["pmc", "pmcid"];

/// Sections whose text is scanned, first occurrence of each
const TEXT_SECTIONS: [&str; 4] = ["article-title", "abstract", "body", "back"];

static PMC_FALLBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:PMC|pmc)(\d+)").expect("invalid PMC pattern"));

/// Immutable unit of work handed to a scan worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTask {
    pub xml: String,
    /// Characters of context on each side of a match
    pub context_size: usize,
}

impl ArticleTask {
    pub fn new(xml: String) -> Self {
        Self {
            xml,
            context_size: ARTICLE_CONTEXT_SIZE,
        }
    }
}

/// Result of processing one article.
///
/// `pmcid` is `None` when the article was malformed or carried no PMC id;
/// `findings` is then empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleOutcome {
    /// Canonical id, e.g. `PMC1234567`
    pub pmcid: Option<String>,
    pub findings: Vec<Finding>,
}

/// Extract every identifier occurrence from one article fragment.
///
/// Occurrences are not deduplicated; they keep their left-to-right order.
pub fn process_article(task: &ArticleTask) -> ArticleOutcome {
    let root = match parse_tree(&task.xml) {
        Ok(root) => root,
        Err(e) => {
            log::warn!("Skipping malformed article: {e:#}");
            return ArticleOutcome::default();
        }
    };

    let Some(pmcid) = find_pmcid(&root, &task.xml) else {
        log::debug!("Skipping article without a PMC id");
        return ArticleOutcome::default();
    };

    let matcher = Matcher::new(MatchConfig {
        context_size: task.context_size,
        dedup: false,
    });
    let document_id = namespaced(&pmcid);
    let findings: Vec<Finding> = matcher
        .find(&article_text(&root))
        .into_iter()
        .map(|m| Finding::from_match(&document_id, m))
        .collect();

    if !findings.is_empty() {
        log::debug!("{pmcid}: {} identifier mention(s)", findings.len());
    }
    ArticleOutcome {
        pmcid: Some(pmcid),
        findings,
    }
}

/// `1234567`, `pmc1234567` or `PMC1234567` → `PMC1234567`
pub fn canonical_pmcid(raw: &str) -> String {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("PMC")
        .or_else(|| raw.strip_prefix("pmc"))
        .unwrap_or(raw);
    format!("PMC{digits}")
}

/// `PMC1234567` → `pmc:PMC1234567`
pub fn namespaced(pmcid: &str) -> String {
    format!("{PMC_NAMESPACE}:{pmcid}")
}

/// First tagged PMC id, else the first `PMC<digits>` anywhere in the raw fragment
fn find_pmcid(root: &Element, raw: &str) -> Option<String> {
    let tagged = root
        .find_where(&|e: &Element| {
            e.name == "article-id"
                && e.attr("pub-id-type")
                    .is_some_and(|t| PMC_ID_TYPES.contains(&t))
        })
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty());
    if let Some(id) = tagged {
        return Some(canonical_pmcid(id));
    }
    PMC_FALLBACK
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|digits| format!("PMC{}", digits.as_str()))
}

/// Scannable text: the text sections joined, whitespace collapsed
fn article_text(root: &Element) -> String {
    let parts: Vec<String> = TEXT_SECTIONS
        .iter()
        .filter_map(|name| root.find_where(&|e: &Element| e.name == *name))
        .map(Element::text_content)
        .collect();
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal element tree: direct text, children, and the text after each element
#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
    tail: String,
}

impl Element {
    fn open(start: &BytesStart) -> Result<Self> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.context("bad attribute")?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            attrs.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            ..Default::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First descendant (document order) satisfying `pred`
    fn find_where(&self, pred: &impl Fn(&Element) -> bool) -> Option<&Element> {
        self.children
            .iter()
            .find_map(|c| if pred(c) { Some(c) } else { c.find_where(pred) })
    }

    /// Depth-first text including tails, with a space wherever pieces would fuse
    fn text_content(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            let child_text = child.text_content();
            if !child_text.is_empty() && !text.is_empty() && !text.ends_with(' ') {
                text.push(' ');
            }
            text.push_str(&child_text);
            if !child.tail.is_empty() {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
                text.push_str(&child.tail);
            }
        }
        text.trim().to_string()
    }
}

fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("XML parse error")? {
            Event::Start(e) => stack.push(Element::open(&e)?),
            Event::Empty(e) => close(&mut stack, &mut root, Element::open(&e)?)?,
            Event::End(_) => {
                let element = stack.pop().context("unbalanced end tag")?;
                close(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                // Unknown entities (e.g. HTML `&nbsp;`) keep their raw form
                let text = e
                    .unescape()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                push_text(&mut stack, &text);
            }
            Event::CData(e) => push_text(&mut stack, &String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        bail!("article ends inside <{}>", open.name);
    }
    root.context("no root element")
}

fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        bail!("content after root element");
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    let Some(top) = stack.last_mut() else {
        return;
    };
    match top.children.last_mut() {
        Some(last) => last.tail.push_str(text),
        None => top.text.push_str(text),
    }
}
