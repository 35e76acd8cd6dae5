//! Text extraction from local documents

use std::borrow::Cow;
use std::fs;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use scraper::{Html, Selector};

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));

/// How a document's bytes are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Html,
    Gzip,
    Text,
}

impl DocumentKind {
    /// Classify by (case-insensitive) extension of a file name
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("pdf") => Self::Pdf,
            Some("html" | "htm") => Self::Html,
            Some("gz") => Self::Gzip,
            _ => Self::Text,
        }
    }
}

/// Read the text content of `path`.
///
/// I/O failures are errors. Content that cannot be extracted (a broken PDF,
/// an invalid gzip stream) is logged and yields an empty string.
pub fn read_document(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(extract_text(&name, &bytes))
}

/// Extract text from in-memory document bytes, dispatching on `name`
pub fn extract_text(name: &str, bytes: &[u8]) -> String {
    match DocumentKind::from_name(name) {
        DocumentKind::Pdf => pdf_text(name, bytes),
        DocumentKind::Html => html_text(&decode_text(bytes)),
        DocumentKind::Gzip => {
            let mut inflated = Vec::new();
            if let Err(e) = MultiGzDecoder::new(bytes).read_to_end(&mut inflated) {
                log::error!("Error decompressing {name}: {e}");
                return String::new();
            }
            let inner = &name[..name.len() - ".gz".len()];
            extract_text(inner, &inflated)
        }
        DocumentKind::Text => decode_text(bytes).into_owned(),
    }
}

/// UTF-8, falling back to Latin-1 (every byte maps to one code point)
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            log::debug!("input is not UTF-8, decoding as Latin-1");
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
        }
    }
}

fn pdf_text(name: &str, bytes: &[u8]) -> String {
    // pdf-extract panics on some malformed inputs
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));
    match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log::error!("Error extracting text from PDF {name}: {e}");
            String::new()
        }
        Err(_) => {
            log::error!("PDF extractor panicked on {name}");
            String::new()
        }
    }
}

/// Visible text of an HTML document: text nodes under `<body>` (or the
/// root), skipping scripts and styles, whitespace collapsed.
pub fn html_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|tag| matches!(tag, "script" | "style" | "noscript"));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn kind_by_extension() {
        assert_eq!(DocumentKind::from_name("a.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_name("a.htm"), DocumentKind::Html);
        assert_eq!(DocumentKind::from_name("a.xml.gz"), DocumentKind::Gzip);
        assert_eq!(DocumentKind::from_name("a.xml"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_name("README"), DocumentKind::Text);
    }

    #[test]
    fn latin1_fallback() {
        let text = decode_text(b"caf\xe9 syn1234567");
        assert_eq!(text, "café syn1234567");
    }

    #[test]
    fn html_skips_scripts() {
        let html = r#"<html><head><title>T</title></head><body>
            <p>Data in <b>syn1234567</b>.</p>
            <script>var x = "syn7654321";</script>
        </body></html>"#;
        let text = html_text(html);
        assert!(text.contains("Data in syn1234567 ."));
        assert!(!text.contains("syn7654321"));
    }

    #[test]
    fn gzip_uses_inner_kind() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"<html><body><p>see syn1234567</p></body></html>")
            .unwrap();
        let gz = enc.finish().unwrap();
        assert_eq!(extract_text("page.html.gz", &gz), "see syn1234567");
    }

    #[test]
    fn corrupt_gzip_is_empty() {
        assert_eq!(extract_text("broken.txt.gz", b"not gzip at all"), "");
    }

    #[test]
    fn corrupt_pdf_is_empty() {
        assert_eq!(extract_text("broken.pdf", b"%PDF-1.4 garbage"), "");
    }
}
