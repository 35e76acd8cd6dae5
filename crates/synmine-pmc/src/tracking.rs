//! Resume marker persisted across runs
//!
//! The marker is the range start (`PMC<n>`) of the last corpus file whose
//! batch was fully handled. Failures to read or write it are logged and
//! reported as values so a scheduled run never dies on a checkpoint.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default tracking file name
pub const DEFAULT_TRACKING_FILE: &str = "last_processed_pmc.json";

static FILENAME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(PMC\d+)_PMC\d+").expect("invalid marker pattern"));

/// On-disk tracking record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub last_processed_pmc_id: String,
    /// ISO-8601 local timestamp of the update
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ProcessingTracker {
    path: PathBuf,
}

impl Default for ProcessingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_FILE)
    }
}

impl ProcessingTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full stored record, if present and readable
    pub fn state(&self) -> Option<TrackingState> {
        if !self.path.exists() {
            return None;
        }
        let read = std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str::<TrackingState>(&text).map_err(Into::into));
        match read {
            Ok(state) => Some(state),
            Err(e) => {
                log::error!("Error reading tracking file {}: {e:#}", self.path.display());
                None
            }
        }
    }

    /// Last stored marker, or `None` when absent or unreadable
    pub fn get_last(&self) -> Option<String> {
        self.state().map(|s| s.last_processed_pmc_id)
    }

    /// Persist `marker` with the current time. Returns whether it was written.
    pub fn update(&self, marker: &str) -> bool {
        let state = TrackingState {
            last_processed_pmc_id: marker.to_string(),
            updated_at: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        };
        match synmine_core::write_json(&self.path, &state) {
            Ok(()) => {
                log::info!("Updated tracking file with PMC ID: {marker}");
                true
            }
            Err(e) => {
                log::error!("Error updating tracking file {}: {e}", self.path.display());
                false
            }
        }
    }
}

/// `PMC11890001_PMC11900000.xml.gz` → `PMC11890001`
pub fn extract_marker_from_filename(name: &str) -> Option<String> {
    FILENAME_MARKER
        .captures(name)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extract_marker() {
        assert_eq!(
            extract_marker_from_filename("PMC11890001_PMC11900000.xml.gz").as_deref(),
            Some("PMC11890001")
        );
        assert_eq!(
            extract_marker_from_filename("results.csv.PMC1_PMC2.xml.gz.csv").as_deref(),
            Some("PMC1")
        );
        assert!(extract_marker_from_filename("oa_comm_xml.incr.xml.gz").is_none());
        assert!(extract_marker_from_filename("PMC123.xml.gz").is_none());
    }

    #[test]
    fn missing_file_has_no_marker() {
        let dir = TempDir::new().unwrap();
        let tracker = ProcessingTracker::new(dir.path().join("last.json"));
        assert!(tracker.get_last().is_none());
    }

    #[test]
    fn marker_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/nested/last.json");
        assert!(ProcessingTracker::new(&path).update("PMC11890001"));

        let fresh = ProcessingTracker::new(&path);
        assert_eq!(fresh.get_last().as_deref(), Some("PMC11890001"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["last_processed_pmc_id"], "PMC11890001");
        assert!(raw["updated_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn corrupt_file_swallowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ProcessingTracker::new(&path).get_last().is_none());
    }

    #[test]
    fn unwritable_location_reports_false() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // Parent "directory" is a regular file
        let tracker = ProcessingTracker::new(blocker.join("last.json"));
        assert!(!tracker.update("PMC1"));
    }
}
