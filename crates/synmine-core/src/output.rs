//! CSV/JSON output with atomic tmp→rename, and batch-file combining

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::finding::{FINDING_COLUMNS, Finding};

/// Provenance column appended by [`combine_batches`]
pub const SOURCE_COLUMN: &str = "source_file";

/// Default glob for per-file batch outputs of `results.csv`
pub const DEFAULT_BATCH_PATTERN: &str = "results.csv.*.csv";

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through a buffered tmp file, then rename over `path`.
///
/// Readers never observe a half-written file; a crash leaves at most a stale `.tmp`.
pub fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    let written = write(&mut out).and_then(|()| out.flush());
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    drop(out);
    fs::rename(&tmp, path)
}

/// Write findings as `pmcid,synid,context` CSV. Returns rows written.
pub fn write_findings_csv(path: &Path, findings: &[Finding]) -> io::Result<usize> {
    write_atomic(path, |out| {
        let mut csv = csv::Writer::from_writer(out);
        csv.write_record(FINDING_COLUMNS)?;
        for f in findings {
            csv.write_record(f.csv_record())?;
        }
        csv.flush()
    })?;
    Ok(findings.len())
}

/// Read a findings CSV written by [`write_findings_csv`]
pub fn read_findings_csv(path: &Path) -> Result<Vec<Finding>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Finding>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serialize any value as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, value)?;
        out.write_all(b"\n")
    })
}

/// Batch output path for one source file: `<output>.<source>.csv`
pub fn batch_path(output: &Path, source_filename: &str) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{source_filename}.csv"));
    output.with_file_name(name)
}

/// Recover the source filename from a batch file name.
///
/// `results.csv.PMC1_PMC2.xml.gz.csv` → `PMC1_PMC2.xml.gz`
pub fn source_from_batch_name(batch_name: &str) -> String {
    let parts: Vec<&str> = batch_name.split('.').collect();
    if parts.len() < 4 {
        return String::new();
    }
    parts[2..parts.len() - 1].join(".")
}

/// Statistics from combining batch files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineStats {
    pub batch_files: usize,
    pub total_rows: usize,
    pub final_rows: usize,
    pub unique_identifiers: usize,
}

/// Concatenate batch CSVs matching `pattern` in `dir` into `output`.
///
/// Adds a [`SOURCE_COLUMN`] with each row's originating source file and drops
/// rows identical on every other column (first occurrence wins). Files whose
/// header differs from the first readable file, or that fail to parse, are
/// skipped with an error log. Returns `None` when nothing matched.
pub fn combine_batches(dir: &Path, pattern: &str, output: &Path) -> Result<Option<CombineStats>> {
    let full_pattern = dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();
    let mut batch_files: Vec<PathBuf> = glob::glob(&full_pattern)
        .with_context(|| format!("Invalid glob pattern: {full_pattern}"))?
        .filter_map(|e| e.ok())
        .filter(|p| p.as_path() != output)
        .collect();
    batch_files.sort();

    log::info!(
        "Found {} batch files matching pattern '{pattern}'",
        batch_files.len()
    );
    if batch_files.is_empty() {
        log::warn!(
            "No files found matching pattern '{pattern}' in {}",
            dir.display()
        );
        return Ok(None);
    }

    let mut header: Option<csv::StringRecord> = None;
    let mut seen: FxHashSet<Vec<String>> = FxHashSet::default();
    let mut rows: Vec<csv::StringRecord> = Vec::new();
    let mut identifiers: FxHashSet<String> = FxHashSet::default();
    let mut total_rows = 0usize;

    for file in &batch_files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let source = source_from_batch_name(&name);
        let read = read_batch(file, &mut header);
        let records = match read {
            Ok(r) => r,
            Err(e) => {
                log::error!("Error reading {}: {e:#}", file.display());
                continue;
            }
        };
        let synid_col = header
            .as_ref()
            .and_then(|h| h.iter().position(|c| c == "synid"));

        log::info!("Added {} rows from {name}", records.len());
        total_rows += records.len();
        for record in records {
            if let Some(id) = synid_col.and_then(|i| record.get(i)) {
                identifiers.insert(id.to_string());
            }
            let key: Vec<String> = record.iter().map(str::to_string).collect();
            if seen.insert(key) {
                let mut row = record;
                row.push_field(&source);
                rows.push(row);
            }
        }
    }

    let Some(header) = header else {
        log::warn!("No data found in any of the batch files");
        return Ok(None);
    };

    write_atomic(output, |out| {
        let mut csv = csv::Writer::from_writer(out);
        let mut full_header = header.clone();
        full_header.push_field(SOURCE_COLUMN);
        csv.write_record(&full_header)?;
        for row in &rows {
            csv.write_record(row)?;
        }
        csv.flush()
    })
    .with_context(|| format!("Failed to write {}", output.display()))?;

    let stats = CombineStats {
        batch_files: batch_files.len(),
        total_rows,
        final_rows: rows.len(),
        unique_identifiers: identifiers.len(),
    };
    log::info!(
        "Combined {} files into {}: {} rows before dedup, {} after, {} unique identifiers",
        stats.batch_files,
        output.display(),
        stats.total_rows,
        stats.final_rows,
        stats.unique_identifiers
    );
    Ok(Some(stats))
}

/// Read all records of one batch file, establishing or checking the shared header
fn read_batch(
    path: &Path,
    header: &mut Option<csv::StringRecord>,
) -> Result<Vec<csv::StringRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let file_header = reader.headers()?.clone();
    if let Some(expected) = header.as_ref() {
        if *expected != file_header {
            anyhow::bail!("header {file_header:?} differs from {expected:?}");
        }
    } else {
        *header = Some(file_header);
    }
    reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}
