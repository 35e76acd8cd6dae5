//! Persisted identifier occurrence

use serde::{Deserialize, Serialize};

use crate::matcher::Match;

/// Column order of the corpus CSV output
pub const FINDING_COLUMNS: [&str; 3] = ["pmcid", "synid", "context"];

/// One identifier occurrence attributed to a source document.
///
/// `context` always contains `identifier` and is at most
/// `2 * context_size + identifier.len()` characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    /// Canonical document identifier, e.g. `pmc:PMC1234567`
    #[serde(rename = "pmcid")]
    pub document_id: String,
    /// Lowercased identifier matching `^syn\d{7,12}$`
    #[serde(rename = "synid")]
    pub identifier: String,
    pub context: String,
    /// Character offset in the scanned text (not exported to the corpus CSV)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl Finding {
    /// Attach a document identifier to a raw match
    pub fn from_match(document_id: &str, m: Match) -> Self {
        Self {
            document_id: document_id.to_string(),
            identifier: m.identifier,
            context: m.full_context,
            position: Some(m.position),
        }
    }

    /// Values in [`FINDING_COLUMNS`] order
    pub fn csv_record(&self) -> [&str; 3] {
        [&self.document_id, &self.identifier, &self.context]
    }
}
