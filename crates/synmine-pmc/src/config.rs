//! Corpus pipeline configuration

use std::path::PathBuf;

use synmine_core::HttpConfig;

use crate::article::ARTICLE_CONTEXT_SIZE;
use crate::splitter::DEFAULT_CHUNK_SIZE;

/// Europe PMC open-access bulk directory
pub const DEFAULT_BASE_URL: &str = "https://europepmc.org/ftp/oa/";

/// Articles handed to the worker pool per round
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Settings for scanning one local corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Worker threads (default: available parallelism)
    pub workers: usize,
    pub batch_size: usize,
    /// Bytes read from the corpus per splitter chunk
    pub chunk_size: usize,
    /// Context characters on each side of a match
    pub context_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            context_size: ARTICLE_CONTEXT_SIZE,
        }
    }
}

/// Runtime configuration for an HTTP corpus walk
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Directory listing URL
    pub base_url: String,
    /// Cumulative CSV; per-file batches are written next to it
    pub output: PathBuf,
    /// Start at this range (`PMC123`, `PMC1_PMC2...` or an exact filename)
    pub start_from: Option<String>,
    /// Only files whose range starts strictly after this PMC number
    pub resume_after: Option<u64>,
    /// Maximum files to process
    pub max_files: Option<usize>,
    pub scan: ScanConfig,
    pub http: HttpConfig,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output: PathBuf::from("results.csv"),
            start_from: None,
            resume_after: None,
            max_files: None,
            scan: ScanConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
