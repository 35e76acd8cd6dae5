//! Upload capability for finished batches
//!
//! The remote store is a collaborator behind [`UploaderCapability`]; a
//! workflow is either given one or runs without uploads. [`DirectoryStore`]
//! implements the capability over a local directory.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use synmine_core::output::read_findings_csv;
use synmine_core::{FINDING_COLUMNS, Finding};

/// Where uploaded batches go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDestinations {
    /// Folder receiving each batch file
    pub folder: String,
    /// Table receiving the de-duplicated rows
    pub table: String,
}

/// Remote store for batch files and aggregated rows.
pub trait UploaderCapability {
    /// Store a file under `folder`. Returns the remote id, or `None` on failure.
    fn upload_file(&self, path: &Path, folder: &str) -> Option<String>;

    /// Document ids (`pmcid` values) already present in `table`.
    fn existing_keys(&self, table: &str) -> HashSet<String>;

    /// Append the rows of the CSV at `path` to `table`, skipping rows whose
    /// `pmcid` is in `filter_keys`. Returns success.
    fn upload_rows(&self, path: &Path, table: &str, filter_keys: &HashSet<String>) -> bool;
}

/// Drop findings whose document is already present remotely
pub fn filter_new_rows(findings: Vec<Finding>, existing: &HashSet<String>) -> Vec<Finding> {
    let before = findings.len();
    let kept: Vec<Finding> = findings
        .into_iter()
        .filter(|f| !existing.contains(&f.document_id))
        .collect();
    if kept.len() < before {
        log::info!("Filtered out {} duplicate PMC IDs", before - kept.len());
    }
    kept
}

/// Upload one batch file, then its rows not already in the table.
///
/// Returns true only when both steps succeeded.
pub fn upload_batch(
    uploader: &dyn UploaderCapability,
    path: &Path,
    destinations: &UploadDestinations,
) -> bool {
    log::info!("Processing batch file: {}", path.display());
    let Some(remote_id) = uploader.upload_file(path, &destinations.folder) else {
        log::error!("Failed to upload batch file: {}", path.display());
        return false;
    };
    log::info!("Uploaded {} as {remote_id}", path.display());

    let existing = uploader.existing_keys(&destinations.table);
    if !uploader.upload_rows(path, &destinations.table, &existing) {
        log::error!("Failed to upload results to table from: {}", path.display());
        return false;
    }
    true
}

/// Capability backed by a local directory.
///
/// Folders are subdirectories of `root`; a table is `root/<table>.csv` with
/// the corpus CSV columns.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }

    fn copy_into(&self, path: &Path, folder: &str) -> Result<String> {
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::copy(path, dir.join(name))
            .with_context(|| format!("Failed to copy {}", path.display()))?;
        Ok(format!("{folder}/{}", name.to_string_lossy()))
    }

    fn append_rows(&self, path: &Path, table: &str, filter_keys: &HashSet<String>) -> Result<usize> {
        let rows = filter_new_rows(read_findings_csv(path)?, filter_keys);
        if rows.is_empty() {
            log::info!("No new data to upload after filtering duplicates");
            return Ok(0);
        }
        let table_path = self.table_path(table);
        let exists = table_path.exists();
        if let Some(parent) = table_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&table_path)
            .with_context(|| format!("Failed to open {}", table_path.display()))?;
        let mut csv = csv::Writer::from_writer(file);
        if !exists {
            csv.write_record(FINDING_COLUMNS)?;
        }
        for row in &rows {
            csv.write_record(row.csv_record())?;
        }
        csv.flush()?;
        Ok(rows.len())
    }
}

impl UploaderCapability for DirectoryStore {
    fn upload_file(&self, path: &Path, folder: &str) -> Option<String> {
        match self.copy_into(path, folder) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Error uploading file {}: {e:#}", path.display());
                None
            }
        }
    }

    fn existing_keys(&self, table: &str) -> HashSet<String> {
        let path = self.table_path(table);
        if !path.exists() {
            return HashSet::new();
        }
        match read_findings_csv(&path) {
            Ok(rows) => {
                let keys: HashSet<String> = rows.into_iter().map(|f| f.document_id).collect();
                log::info!("Found {} existing PMC IDs in table {table}", keys.len());
                keys
            }
            Err(e) => {
                log::error!("Error querying existing PMC IDs from table {table}: {e:#}");
                HashSet::new()
            }
        }
    }

    fn upload_rows(&self, path: &Path, table: &str, filter_keys: &HashSet<String>) -> bool {
        match self.append_rows(path, table, filter_keys) {
            Ok(n) => {
                log::info!("Uploaded {n} new rows to table {table}");
                true
            }
            Err(e) => {
                log::error!("Error uploading results to table {table}: {e:#}");
                false
            }
        }
    }
}
