//! Synmine Local - identifier mining over documents on disk
//!
//! Reads PDF, HTML, XML, plain-text and gzipped documents, scans them with the
//! shared matcher, and summarizes which identifiers appear in how many
//! documents.

pub mod miner;
pub mod reader;
pub mod summary;

pub use miner::{DEFAULT_EXTENSIONS, LocalFinding, LocalMiner, ResultSet};
pub use reader::{DocumentKind, read_document};
pub use summary::{FileSummary, IdFrequency, Summary, save_csv, save_json, summarize};
