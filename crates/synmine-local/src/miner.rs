//! Single-file and directory mining

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use synmine_core::progress::upgrade_to_count;
use synmine_core::{Match, MatchConfig, Matcher};

use crate::reader::read_document;

/// Extensions scanned when the caller passes none
pub const DEFAULT_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".xml", ".html"];

/// One identifier occurrence in a local document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFinding {
    pub synapse_id: String,
    /// File name (no directory) of the source document
    pub document: String,
    /// Character offset of the match
    pub position: usize,
    pub context_before: String,
    pub context_after: String,
    pub full_context: String,
}

impl LocalFinding {
    fn from_match(document: &str, m: Match) -> Self {
        Self {
            synapse_id: m.identifier,
            document: document.to_string(),
            position: m.position,
            context_before: m.context_before,
            context_after: m.context_after,
            full_context: m.full_context,
        }
    }
}

/// Findings per document name; documents without findings are absent
pub type ResultSet = BTreeMap<String, Vec<LocalFinding>>;

/// Mines local files with one [`Matcher`] configuration.
#[derive(Clone)]
pub struct LocalMiner {
    matcher: Matcher,
    progress: ProgressBar,
}

impl LocalMiner {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            matcher: Matcher::new(config),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-file progress of [`process_directory`](Self::process_directory) on `pb`
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        self.matcher.config()
    }

    /// Identifiers in `text`, attributed to `document`
    pub fn extract(&self, text: &str, document: &str) -> Vec<LocalFinding> {
        log::debug!("Extracting identifiers from {document}");
        self.matcher
            .find(text)
            .into_iter()
            .map(|m| LocalFinding::from_match(document, m))
            .collect()
    }

    /// Mine one file. A missing file is an error; an empty or unextractable
    /// document yields no findings.
    pub fn process_file(&self, path: &Path) -> Result<Vec<LocalFinding>> {
        if !path.is_file() {
            bail!("File not found: {}", path.display());
        }
        let name = document_name(path);
        log::info!("Processing file: {name}");

        let text = read_document(path)?;
        if text.trim().is_empty() {
            log::warn!("No text content extracted from {name}");
            return Ok(Vec::new());
        }

        let findings = self.extract(&text, &name);
        log::info!("Found {} identifier mentions in {name}", findings.len());
        Ok(findings)
    }

    /// Mine every file directly inside `dir` whose name ends with one of
    /// `extensions` (or [`DEFAULT_EXTENSIONS`] when empty).
    ///
    /// Per-file failures are logged and skipped.
    pub fn process_directory(
        &self,
        dir: &Path,
        extensions: &[String],
        parallel: bool,
    ) -> Result<ResultSet> {
        if !dir.is_dir() {
            bail!("Directory not found: {}", dir.display());
        }
        let files = list_files(dir, extensions)?;
        log::info!("Found {} files to process in {}", files.len(), dir.display());
        if files.is_empty() {
            log::warn!("No files found in {} with extensions {extensions:?}", dir.display());
            return Ok(ResultSet::new());
        }

        upgrade_to_count(&self.progress, files.len() as u64);
        let outcomes: Vec<(String, Result<Vec<LocalFinding>>)> = if parallel {
            files
                .par_iter()
                .progress_with(self.progress.clone())
                .map(|p| (document_name(p), self.process_file(p)))
                .collect()
        } else {
            files
                .iter()
                .progress_with(self.progress.clone())
                .map(|p| (document_name(p), self.process_file(p)))
                .collect()
        };
        self.progress.finish_and_clear();

        let mut results = ResultSet::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(findings) if !findings.is_empty() => {
                    results.insert(name, findings);
                }
                Ok(_) => {}
                Err(e) => log::error!("Error processing {name}: {e:#}"),
            }
        }
        Ok(results)
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Regular files in `dir` (not recursive) ending with any extension, sorted
fn list_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let defaults: Vec<String>;
    let extensions: &[String] = if extensions.is_empty() {
        defaults = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        &defaults
    } else {
        extensions
    };

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for ext in extensions {
        let pattern = format!("{base}/*{}", glob::Pattern::escape(ext));
        let matches =
            glob::glob(&pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        files.extend(matches.filter_map(|e| e.ok()).filter(|p| p.is_file()));
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn miner() -> LocalMiner {
        LocalMiner::new(MatchConfig {
            context_size: 20,
            dedup: true,
        })
    }

    #[test]
    fn extract_attributes_document() {
        let found = miner().extract("Data was deposited at syn1234567 for reuse.", "paper.txt");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].synapse_id, "syn1234567");
        assert_eq!(found[0].document, "paper.txt");
        assert_eq!(found[0].position, 22);
        assert_eq!(found[0].context_after, "for reuse.");
    }

    #[test]
    fn missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(miner().process_file(&dir.path().join("absent.txt")).is_err());
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        assert!(miner().process_file(&path).unwrap().is_empty());
    }

    #[test]
    fn listing_filters_and_dedups() {
        let dir = TempDir::new().unwrap();
        for name in ["a.txt", "b.xml", "c.csv", "d.xml.gz"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let names = |exts: &[&str]| -> Vec<String> {
            let exts: Vec<String> = exts.iter().map(|e| e.to_string()).collect();
            list_files(dir.path(), &exts)
                .unwrap()
                .iter()
                .map(|p| document_name(p))
                .collect()
        };
        assert_eq!(names(&[]), vec!["a.txt", "b.xml"]);
        assert_eq!(names(&[".gz", ".xml.gz"]), vec!["d.xml.gz"]);
    }
}
