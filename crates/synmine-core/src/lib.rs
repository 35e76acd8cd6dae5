//! Synmine Core - shared infrastructure for mining Synapse identifiers
//!
//! Identifier matching, finding records and their CSV/JSON output, plus the
//! HTTP, retry, progress, logging and shutdown plumbing used by the corpus
//! and local-document pipelines.

pub mod error;
pub mod finding;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod stream;

// Re-exports for convenience
pub use error::FetchError;
pub use finding::{FINDING_COLUMNS, Finding};
pub use logging::{IndicatifLogger, LogOptions, init_logging};
pub use matcher::{DEFAULT_CONTEXT_SIZE, Match, MatchConfig, Matcher, is_synapse_id};
pub use output::{CombineStats, combine_batches, write_findings_csv, write_json};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
pub use stream::{HttpClient, HttpConfig, StreamError};
