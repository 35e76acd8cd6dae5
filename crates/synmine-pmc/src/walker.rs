//! Sequential HTTP corpus walk
//!
//! One file at a time: download to scratch, scan, write the per-file batch
//! and the cumulative CSV, delete the download. A failing file is logged and
//! counted. The walk itself fails on an unreachable listing or when the final
//! save of the cumulative CSV fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use synmine_core::output::batch_path;
use synmine_core::progress::fmt_num;
use synmine_core::shutdown::is_shutdown_requested;
use synmine_core::{
    FetchError, Finding, HttpClient, ProgressContext, RetryPolicy, SharedProgress,
    retry_with_backoff, write_findings_csv,
};
use tempfile::TempDir;

use crate::config::WalkConfig;
use crate::manifest::{CorpusFileEntry, fetch_listing, select_entries};
use crate::scanner::{CorpusScanner, ScanStats};

/// One corpus file handled to completion
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub entry: CorpusFileEntry,
    pub stats: ScanStats,
    /// `<output>.<filename>.csv`, when the file produced findings
    pub batch_path: Option<PathBuf>,
}

/// Per-file notification passed to [`Walker::run_with`]
#[derive(Debug, Clone, Copy)]
pub enum FileEvent<'a> {
    Completed(&'a FileOutcome),
    Failed(&'a CorpusFileEntry),
}

/// Walk execution summary
#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub total_articles: usize,
    pub total_findings: usize,
    /// Stopped early on a shutdown request
    pub interrupted: bool,
    pub elapsed: Duration,
}

pub struct Walker {
    config: WalkConfig,
    client: HttpClient,
    scanner: CorpusScanner,
    progress: SharedProgress,
}

impl Walker {
    pub fn new(config: WalkConfig, progress: SharedProgress) -> Result<Self> {
        let client = HttpClient::new(config.http.clone()).context("Failed to build HTTP client")?;
        let scanner = CorpusScanner::new(config.scan.clone())?;
        Ok(Self {
            config,
            client,
            scanner,
            progress,
        })
    }

    /// Walker without progress bars (tests, non-interactive use)
    pub fn headless(config: WalkConfig) -> Result<Self> {
        Self::new(config, Arc::new(ProgressContext::hidden()))
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn run(&self) -> Result<WalkSummary> {
        self.run_with(|_| {})
    }

    /// Run the walk, reporting each file as it completes or fails.
    pub fn run_with(&self, mut on_file: impl FnMut(FileEvent<'_>)) -> Result<WalkSummary> {
        let start = Instant::now();
        let config = &self.config;

        let mut entries = fetch_listing(&self.client, &config.base_url)?;
        if let Some(after) = config.resume_after {
            entries.retain(|e| e.range_start > after);
            log::info!(
                "Resuming after PMC{after}: {} files remain",
                entries.len()
            );
        }
        let entries = select_entries(entries, config.start_from.as_deref(), config.max_files);

        // Removed on drop, whether the walk completes, fails or is interrupted
        let scratch = TempDir::with_prefix("synmine-")
            .context("Failed to create scratch directory")?;

        let mut summary = WalkSummary {
            total_files: entries.len(),
            ..Default::default()
        };
        log::info!("Processing {} files", summary.total_files);

        let stage = self.progress.stage_line("walk");
        let mut all_findings: Vec<Finding> = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            if is_shutdown_requested() {
                log::warn!("Shutdown requested, stopping before {}", entry.filename);
                summary.interrupted = true;
                break;
            }
            stage.set_message(format!(
                "file {}/{}: {} ({} ids so far)",
                i + 1,
                summary.total_files,
                entry.filename,
                fmt_num(all_findings.len())
            ));

            match self.process_entry(entry, scratch.path(), &mut all_findings) {
                Ok(outcome) if outcome.stats.interrupted => {
                    summary.interrupted = true;
                    break;
                }
                Ok(outcome) => {
                    summary.completed_files += 1;
                    summary.total_articles += outcome.stats.processed;
                    summary.total_findings += outcome.stats.findings;
                    on_file(FileEvent::Completed(&outcome));
                }
                Err(e) => {
                    summary.failed_files += 1;
                    log::error!("Error processing {}: {e:#}", entry.url);
                    on_file(FileEvent::Failed(entry));
                }
            }
        }
        stage.finish_and_clear();

        if all_findings.is_empty() {
            log::warn!("No findings to save");
        } else {
            let total = write_findings_csv(&config.output, &all_findings)
                .with_context(|| format!("Failed to save {}", config.output.display()))?;
            log::info!(
                "Final save: {} total findings in {}",
                fmt_num(total),
                config.output.display()
            );
        }

        summary.elapsed = start.elapsed();
        log::info!(
            "Files: {}/{} completed ({} failed), {} articles, {} identifier mentions, {:.1}s",
            summary.completed_files,
            summary.total_files,
            summary.failed_files,
            fmt_num(summary.total_articles),
            fmt_num(summary.total_findings),
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Download, scan and persist one corpus file.
    fn process_entry(
        &self,
        entry: &CorpusFileEntry,
        scratch: &Path,
        all_findings: &mut Vec<Finding>,
    ) -> Result<FileOutcome> {
        let local_name = Path::new(&entry.filename)
            .file_name()
            .with_context(|| format!("Invalid file name {}", entry.filename))?;
        let local = scratch.join(local_name);

        let pb = self.progress.download_bar(&entry.filename);
        let policy = RetryPolicy::from(self.client.config());
        let downloaded = retry_with_backoff(&entry.filename, &pb, &policy, || {
            pb.set_position(0);
            self.client
                .download(&entry.url, &local, &pb)
                .map_err(FetchError::from)
        });
        pb.finish_and_clear();
        let bytes = downloaded.with_context(|| format!("Failed to download {}", entry.url))?;
        log::debug!("Downloaded {} ({bytes} bytes)", entry.filename);

        let pb = self.progress.article_bar(&entry.filename, None);
        let scanned = self.scanner.scan(&local, &pb);
        pb.finish_and_clear();
        remove_scratch(&local);
        let scan = scanned?;
        if scan.stats.interrupted {
            log::warn!("Discarding partial results of {}", entry.filename);
            return Ok(FileOutcome {
                entry: entry.clone(),
                stats: scan.stats,
                batch_path: None,
            });
        }

        let mut batch = None;
        if !scan.findings.is_empty() {
            let path = batch_path(&self.config.output, &entry.filename);
            let n = write_findings_csv(&path, &scan.findings)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!(
                "Saved {n} findings from {} to {}",
                entry.filename,
                path.display()
            );
            batch = Some(path);

            all_findings.extend(scan.findings);
            match write_findings_csv(&self.config.output, all_findings) {
                Ok(total) => log::info!("Updated main results file with {total} total findings"),
                Err(e) => log::error!(
                    "Failed to update {}: {e}",
                    self.config.output.display()
                ),
            }
        }

        Ok(FileOutcome {
            entry: entry.clone(),
            stats: scan.stats,
            batch_path: batch,
        })
    }
}

fn remove_scratch(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::info!("Removed downloaded file: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {e}", path.display()),
    }
}
