//! HTTP client with read-stall detection and streaming downloads.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall detection,
//! but presents a sync interface so the single-threaded walker and rayon
//! workers never need an async context.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::pin::Pin;
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::ProgressBar;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::runtime::Handle;

/// Buffer size for file downloads (256KB)
const DOWNLOAD_BUF_SIZE: usize = 256 * 1024;

/// Per-client HTTP settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connect timeout
    pub connect_timeout: Duration,
    /// No data for this long during a body read = stall
    pub read_timeout: Duration,
    /// Overall deadline for small requests (directory listings)
    pub request_timeout: Duration,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            user_agent: concat!("synmine/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Transient conditions worth another attempt.
    ///
    /// Connection failures, 408, 429 and 5xx (server busy) retry; other 4xx
    /// mean the request itself is wrong. Disk full never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => match status {
                None => true,
                Some(s) => matches!(s, 408 | 429 | 500..=599),
            },
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Blocking facade over an async reqwest client.
///
/// Each instance owns its runtime and header/timeout settings, so several
/// differently configured clients can coexist in one process.
pub struct HttpClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    config: HttpConfig,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| StreamError::from_reqwest(&e))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        Ok(Self {
            client,
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET a small text resource (e.g. a directory listing).
    pub fn get_text(&self, url: &str) -> Result<String, StreamError> {
        let deadline = self.config.request_timeout;
        self.runtime.block_on(async {
            let fetch = async {
                self.client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| StreamError::from_reqwest(&e))?
                    .text()
                    .await
                    .map_err(|e| StreamError::from_reqwest(&e))
            };
            match tokio::time::timeout(deadline, fetch).await {
                Ok(result) => result,
                Err(_) => Err(StreamError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("request timed out after {deadline:?}"),
                ))),
            }
        })
    }

    /// Stream `url` into `dest`, reporting bytes on `pb`.
    ///
    /// Writes to `<dest>.part` and renames on completion, so `dest` only ever
    /// holds a complete body. Returns bytes written.
    pub fn download(&self, url: &str, dest: &Path, pb: &ProgressBar) -> Result<u64, StreamError> {
        let (mut body, total_bytes) = self.open_body(url)?;
        if let Some(total) = total_bytes {
            crate::progress::upgrade_to_bytes(pb, total);
        }

        let mut part_name = dest.file_name().unwrap_or_default().to_os_string();
        part_name.push(".part");
        let part = dest.with_file_name(part_name);

        let copied = copy_with_progress(&mut body, &part, pb);
        let written = match copied {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&part);
                return Err(e.into());
            }
        };

        if let Some(expected) = total_bytes.filter(|t| *t != written) {
            let _ = fs::remove_file(&part);
            return Err(StreamError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated body: {written} of {expected} bytes"),
            )));
        }

        fs::rename(&part, dest)?;
        Ok(written)
    }

    /// HTTP GET → sync reader over the response body, plus Content-Length
    fn open_body(&self, url: &str) -> Result<(TimeoutReader, Option<u64>), StreamError> {
        let (reader, total_bytes) = self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| StreamError::from_reqwest(&e))?;

            let total_bytes = response.content_length();

            let stream = response.bytes_stream();
            let async_reader = tokio_util::io::StreamReader::new(
                stream.map(|result| result.map_err(io::Error::other)),
            );
            let reader: Pin<Box<dyn AsyncRead + Send + Sync>> = Box::pin(async_reader);
            Ok::<_, StreamError>((reader, total_bytes))
        })?;

        Ok((
            TimeoutReader {
                inner: reader,
                handle: self.runtime.handle().clone(),
                timeout: self.config.read_timeout,
            },
            total_bytes,
        ))
    }
}

fn copy_with_progress(body: &mut impl Read, part: &Path, pb: &ProgressBar) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(part)?);
    let mut buf = vec![0u8; DOWNLOAD_BUF_SIZE];
    let mut written = 0u64;
    loop {
        let n = body.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        written += n as u64;
        pb.inc(n as u64);
    }
    out.flush()?;
    Ok(written)
}

/// Async-to-sync bridge with read timeout.
///
/// Each read operation has a timeout - if no data arrives within the
/// configured window, returns TimedOut (which the caller's retry treats as
/// transient).
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
    handle: Handle,
    timeout: Duration,
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.timeout;
        let handle = self.handle.clone();
        handle.block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(timeout, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read timeout ({timeout:?} with no data)"),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_503_retryable() {
        assert!(http_err(503).is_retryable());
    }

    #[test]
    fn http_429_and_408_retryable() {
        assert!(http_err(429).is_retryable());
        assert!(http_err(408).is_retryable());
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn http_403_not_retryable() {
        assert!(!http_err(403).is_retryable());
    }

    #[test]
    fn io_timeout_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn http_none_status_retryable() {
        // Network error without status code should be retryable
        let err = StreamError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn display_http_with_status() {
        let err = http_err(404);
        assert_eq!(format!("{err}"), "HTTP 404: test");
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn default_config_matches_listing_policy() {
        let cfg = HttpConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.retry_delay, Duration::from_secs(5));
        assert!(cfg.user_agent.starts_with("synmine/"));
    }

    #[test]
    fn clients_with_different_configs_coexist() {
        let a = HttpClient::new(HttpConfig::default()).unwrap();
        let b = HttpClient::new(HttpConfig {
            max_attempts: 7,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(a.config().max_attempts, 3);
        assert_eq!(b.config().max_attempts, 7);
    }
}
