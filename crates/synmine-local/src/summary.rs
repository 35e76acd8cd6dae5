//! Result-set statistics and export

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use synmine_core::output::{write_atomic, write_json};

use crate::miner::{LocalFinding, ResultSet};

/// How many identifiers [`summarize`] ranks
pub const TOP_IDS: usize = 10;

/// Document frequency of one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdFrequency {
    pub synapse_id: String,
    pub documents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_documents_processed: usize,
    pub total_synapse_id_mentions: usize,
    pub unique_synapse_ids: usize,
    /// Most widespread identifiers, by number of documents mentioning them
    pub top_mentioned_ids: Vec<IdFrequency>,
}

/// Counts for a single mined file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub total_mentions: usize,
    pub unique_ids: usize,
}

impl FileSummary {
    pub fn of(findings: &[LocalFinding]) -> Self {
        let unique: BTreeSet<&str> = findings.iter().map(|f| f.synapse_id.as_str()).collect();
        Self {
            total_mentions: findings.len(),
            unique_ids: unique.len(),
        }
    }
}

/// Aggregate statistics over a [`ResultSet`].
///
/// Ties in document frequency rank by identifier.
pub fn summarize(results: &ResultSet) -> Summary {
    let mut doc_freq: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (doc, findings) in results {
        for f in findings {
            doc_freq.entry(&f.synapse_id).or_default().insert(doc);
        }
    }

    let mut ranked: Vec<IdFrequency> = doc_freq
        .iter()
        .map(|(id, docs)| IdFrequency {
            synapse_id: id.to_string(),
            documents: docs.len(),
        })
        .collect();
    // stable sort keeps identifier order among ties
    ranked.sort_by(|a, b| b.documents.cmp(&a.documents));
    ranked.truncate(TOP_IDS);

    Summary {
        total_documents_processed: results.len(),
        total_synapse_id_mentions: results.values().map(Vec::len).sum(),
        unique_synapse_ids: doc_freq.len(),
        top_mentioned_ids: ranked,
    }
}

/// Flatten all findings into one CSV. Returns rows written; an empty result
/// set writes nothing.
pub fn save_csv(results: &ResultSet, path: &Path) -> Result<usize> {
    let rows: usize = results.values().map(Vec::len).sum();
    if rows == 0 {
        log::warn!("No findings to save");
        return Ok(0);
    }
    write_atomic(path, |out| {
        let mut csv = csv::Writer::from_writer(out);
        for finding in results.values().flatten() {
            csv.serialize(finding)?;
        }
        csv.flush()
    })
    .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Results saved to {}", path.display());
    Ok(rows)
}

/// Write the result set as a JSON object keyed by document
pub fn save_json(results: &ResultSet, path: &Path) -> Result<()> {
    write_json(path, results).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Results saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finding(doc: &str, id: &str) -> LocalFinding {
        LocalFinding {
            synapse_id: id.to_string(),
            document: doc.to_string(),
            position: 0,
            context_before: String::new(),
            context_after: "was used".to_string(),
            full_context: format!("{id} was used"),
        }
    }

    fn sample() -> ResultSet {
        let mut results = ResultSet::new();
        results.insert(
            "a.txt".to_string(),
            vec![finding("a.txt", "syn2222222"), finding("a.txt", "syn1111111")],
        );
        results.insert(
            "b.txt".to_string(),
            vec![
                finding("b.txt", "syn1111111"),
                finding("b.txt", "syn1111111"),
                finding("b.txt", "syn3333333"),
            ],
        );
        results
    }

    #[test]
    fn summary_counts() {
        let s = summarize(&sample());
        assert_eq!(s.total_documents_processed, 2);
        assert_eq!(s.total_synapse_id_mentions, 5);
        assert_eq!(s.unique_synapse_ids, 3);
        assert_eq!(s.top_mentioned_ids[0].synapse_id, "syn1111111");
        assert_eq!(s.top_mentioned_ids[0].documents, 2);
        assert_eq!(s.top_mentioned_ids[1].synapse_id, "syn2222222");
        assert_eq!(s.top_mentioned_ids.len(), 3);
    }

    #[test]
    fn summary_caps_ranking() {
        let mut results = ResultSet::new();
        for i in 0..15 {
            let doc = format!("d{i}.txt");
            results.insert(doc.clone(), vec![finding(&doc, &format!("syn{:07}", 1_000_000 + i))]);
        }
        assert_eq!(summarize(&results).top_mentioned_ids.len(), TOP_IDS);
    }

    #[test]
    fn file_summary() {
        let s = FileSummary::of(&sample()["b.txt"]);
        assert_eq!(s, FileSummary { total_mentions: 3, unique_ids: 2 });
    }

    #[test]
    fn csv_has_local_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(save_csv(&sample(), &path).unwrap(), 5);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "synapse_id,document,position,context_before,context_after,full_context\n"
        ));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn empty_csv_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(save_csv(&ResultSet::new(), &path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn json_keyed_by_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        save_json(&sample(), &path).unwrap();
        let back: ResultSet =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, sample());
    }
}
