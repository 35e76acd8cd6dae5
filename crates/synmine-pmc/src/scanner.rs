//! Parallel scan of one local corpus file
//!
//! The splitter feeds fixed-size batches of article fragments to a rayon
//! pool; results come back over a channel in completion order. A panic in
//! one article is caught and counted, never tearing down the batch.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use synmine_core::Finding;
use synmine_core::progress::{fmt_num, upgrade_to_count};
use synmine_core::shutdown::is_shutdown_requested;

use crate::article::{ArticleOutcome, ArticleTask, process_article};
use crate::config::ScanConfig;
use crate::splitter::{ArticleSplitter, count_articles, open_corpus};

/// Counters for one scanned file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Pre-pass estimate (lines containing a start marker)
    pub estimated: usize,
    /// Articles that came back from the pool, including failures
    pub processed: usize,
    /// Articles whose processing panicked
    pub failed: usize,
    /// Articles with a usable PMC id
    pub identified: usize,
    pub findings: usize,
    /// Stopped early on a shutdown request
    pub interrupted: bool,
}

/// Findings of one scanned file plus its counters
#[derive(Debug, Default)]
pub struct ScanResult {
    pub stats: ScanStats,
    pub findings: Vec<Finding>,
}

/// Scans corpus files with a dedicated worker pool.
pub struct CorpusScanner {
    config: ScanConfig,
    pool: rayon::ThreadPool,
}

impl CorpusScanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("synmine-scan-{i}"))
            .build()
            .context("Failed to create thread pool")?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every article in `path` (plain or `.gz`).
    ///
    /// Errors only when the file cannot be read; malformed or failing
    /// articles are contained and counted.
    pub fn scan(&self, path: &Path, pb: &ProgressBar) -> Result<ScanResult> {
        let start = Instant::now();
        let name = path.file_name().unwrap_or_default().to_string_lossy();

        log::info!("Counting articles in {name}...");
        let estimated = count_articles(
            open_corpus(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )
        .with_context(|| format!("Failed to read {}", path.display()))?;
        log::info!("Found {} articles to process", fmt_num(estimated));
        upgrade_to_count(pb, estimated as u64);

        let mut splitter = ArticleSplitter::new(
            open_corpus(path).with_context(|| format!("Failed to open {}", path.display()))?,
            self.config.chunk_size,
        );

        let mut result = ScanResult {
            stats: ScanStats {
                estimated,
                ..Default::default()
            },
            findings: Vec::new(),
        };

        loop {
            if is_shutdown_requested() {
                log::warn!("Shutdown requested, stopping scan of {name}");
                result.stats.interrupted = true;
                break;
            }
            let batch: Vec<String> = splitter
                .by_ref()
                .take(self.config.batch_size.max(1))
                .collect::<std::io::Result<_>>()
                .with_context(|| format!("Failed to read articles from {}", path.display()))?;
            if batch.is_empty() {
                break;
            }
            self.run_batch(batch, &mut result, pb);
            pb.set_message(format!("{} ids", fmt_num(result.stats.findings)));
        }

        let stats = &result.stats;
        if !stats.interrupted && stats.processed != stats.estimated {
            log::warn!(
                "Processed {} articles but expected {} in {name}",
                stats.processed,
                stats.estimated
            );
        }
        log::info!(
            "{name}: {} articles, {} with PMC id, {} identifier mentions in {:.1}s",
            fmt_num(stats.processed),
            fmt_num(stats.identified),
            fmt_num(stats.findings),
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }

    /// Submit one batch to the pool and merge results as they complete.
    fn run_batch(&self, batch: Vec<String>, result: &mut ScanResult, pb: &ProgressBar) {
        let (tx, rx) = mpsc::channel::<Result<ArticleOutcome, String>>();
        for xml in batch {
            let task = ArticleTask {
                xml,
                context_size: self.config.context_size,
            };
            let tx = tx.clone();
            self.pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| process_article(&task)))
                    .map_err(|payload| panic_message(payload.as_ref()));
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        for outcome in rx {
            result.stats.processed += 1;
            match outcome {
                Ok(outcome) => {
                    if outcome.pmcid.is_some() {
                        result.stats.identified += 1;
                    }
                    result.stats.findings += outcome.findings.len();
                    result.findings.extend(outcome.findings);
                }
                Err(msg) => {
                    result.stats.failed += 1;
                    log::error!("Error processing article: {msg}");
                }
            }
            pb.inc(1);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
