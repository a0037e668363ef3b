//! Retry utilities with exponential backoff.
//!
//! Platform calls are not retried by default. When `APS_MAX_RETRIES` is set,
//! the client retries only failures its predicate marks as transient;
//! authorization and not-found failures are always returned immediately.
//!
//! # Example
//!
//! ```rust,no_run
//! use acc_mcp::retry::{with_retry_if, RetryConfig};
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Transient,
//!     Permanent,
//! }
//!
//! async fn example() -> Result<(), FetchError> {
//!     with_retry_if(
//!         &RetryConfig::default(),
//!         || async { Err(FetchError::Transient) },
//!         |err| matches!(err, FetchError::Transient),
//!     )
//!     .await
//! }
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Backoff policy for transient platform failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts in total, the first call included
    pub max_attempts: u32,

    /// Wait before the second attempt
    pub initial_delay: Duration,

    /// Upper bound for any single wait
    pub max_delay: Duration,

    /// Growth factor applied to the wait after each retry
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 1.0,
        }
    }

    /// Wait before retry number `retry` (1-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.exponential_base.powi(retry.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Run `operation`, retrying the failures `is_retryable` accepts.
///
/// A rejected failure is returned as soon as it occurs. Accepted failures
/// are retried after [`RetryConfig::backoff`] until `max_attempts` calls
/// have been made; the last failure is then returned.
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut operation: F,
    mut is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempts = attempt, "Platform call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        if attempt >= max_attempts {
            if max_attempts > 1 {
                error!(attempts = attempt, error = ?err, "Giving up on platform call");
            }
            return Err(err);
        }

        let wait = config.backoff(attempt);
        warn!(
            attempt,
            max_attempts,
            wait_ms = wait.as_millis() as u64,
            error = ?err,
            "Transient platform failure, retrying"
        );
        sleep(wait).await;
        attempt += 1;
    }
}
