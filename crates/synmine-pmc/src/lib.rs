//! Synmine PMC - identifier mining over the PubMed Central open-access corpus
//!
//! Streams multi-gigabyte `*.xml.gz` bulk files article by article, scans
//! each article in parallel, and walks the remote directory listing file by
//! file with retry, per-file checkpoints and resumable progress.
//!
//! # Example
//!
//! ```ignore
//! use synmine_pmc::{WalkConfig, Walker};
//!
//! let config = WalkConfig {
//!     max_files: Some(1),
//!     ..Default::default()
//! };
//! let summary = Walker::headless(config)?.run()?;
//! println!("{} identifier mentions", summary.total_findings);
//! ```

pub mod article;
pub mod config;
pub mod manifest;
pub mod scanner;
pub mod splitter;
pub mod tracking;
pub mod upload;
pub mod walker;
pub mod workflow;

// Re-exports
pub use article::{ArticleOutcome, ArticleTask, process_article};
pub use config::{ScanConfig, WalkConfig};
pub use manifest::{CorpusFileEntry, fetch_listing, parse_listing, select_entries};
pub use scanner::{CorpusScanner, ScanResult, ScanStats};
pub use splitter::{ArticleSplitter, count_articles, open_corpus};
pub use tracking::{ProcessingTracker, extract_marker_from_filename};
pub use upload::{DirectoryStore, UploadDestinations, UploaderCapability, filter_new_rows, upload_batch};
pub use walker::{FileEvent, FileOutcome, WalkSummary, Walker};
pub use workflow::{Workflow, WorkflowSummary};
