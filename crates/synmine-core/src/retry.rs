//! Bounded retry with a fixed delay between attempts

use std::time::Duration;

use indicatif::ProgressBar;

use crate::error::FetchError;
use crate::stream::HttpConfig;

/// How many times to try, and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1)
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(cfg: &HttpConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            delay: cfg.retry_delay,
        }
    }
}

/// Retry a fallible fetch until it succeeds, fails permanently, or runs out of attempts.
///
/// On retryable errors, logs the failure, updates the progress bar, sleeps,
/// and tries again. Returns the final `Err` on exhaustion or non-retryable error.
pub fn retry_with_backoff<T>(
    label: &str,
    pb: &ProgressBar,
    policy: &RetryPolicy,
    mut attempt_fn: impl FnMut() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                pb.set_message(format!("retry {attempt}/{}...", max_attempts - 1));
                log::warn!(
                    "{label}: attempt {attempt}/{max_attempts} failed: {e}, retrying in {:?}",
                    policy.delay
                );
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => {
                log::error!("{label}: failed permanently after {attempt} attempt(s): {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamError;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    fn busy() -> FetchError {
        FetchError::Stream(StreamError::Http {
            status: Some(503),
            message: "busy".to_string(),
        })
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = retry_with_backoff("t", &ProgressBar::hidden(), &policy(3), || {
            calls += 1;
            if calls < 3 { Err(busy()) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("t", &ProgressBar::hidden(), &policy(3), || {
            calls += 1;
            Err(busy())
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff("t", &ProgressBar::hidden(), &policy(5), || {
            calls += 1;
            Err(FetchError::Stream(StreamError::Http {
                status: Some(404),
                message: "missing".to_string(),
            }))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn policy_from_http_config() {
        let cfg = HttpConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let p = RetryPolicy::from(&cfg);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.delay, cfg.retry_delay);
    }
}
