//! Bounded retry with capped linear backoff.
//!
//! Wraps any single provider call. Attempt `n` failing with a transient
//! error sleeps `min(base_delay * n, max_delay)` before the next try; after
//! `max_attempts` the last error is returned unchanged.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config;
use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryPolicy {
    /// Load from RETRY_MAX_ATTEMPTS / RETRY_BASE_DELAY_MS / RETRY_MAX_DELAY_MS
    pub fn from_env() -> Self {
        Self {
            max_attempts: config::retry_max_attempts(),
            base_delay_ms: config::retry_base_delay_ms(),
            max_delay_ms: config::retry_max_delay_ms(),
        }
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(u64::from(attempt))
            .min(self.max_delay_ms)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt cap is reached.
pub async fn retry_async<T, Fut, F>(
    policy: &RetryPolicy,
    op_name: &str,
    mut operation: F,
) -> Result<T, ReconcileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReconcileError>>,
{
    let start = std::time::Instant::now();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "retry op={} succeeded after {} attempts (elapsed={}ms)",
                        op_name,
                        attempt,
                        start.elapsed().as_millis()
                    );
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!("retry op={} non-retryable error: {}", op_name, err);
                return Err(err);
            }
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    "retry op={} failed after {} attempts (elapsed={}ms): {}",
                    op_name,
                    attempt,
                    start.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
            Err(err) => {
                let backoff_ms = policy.backoff_ms(attempt);
                debug!(
                    "retry op={} attempt={} backoff_ms={} error={}",
                    op_name, attempt, backoff_ms, err
                );
                if backoff_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable(status: Option<u16>) -> ReconcileError {
        ReconcileError::ProviderUnavailable {
            provider: "rugbydb".to_string(),
            status,
            message: "simulated".to_string(),
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 5,
            max_delay_ms: 10,
        }
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 5000);
    }

    #[test]
    fn test_linear_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(1), 1000);
        assert_eq!(policy.backoff_ms(2), 2000);
        assert_eq!(policy.backoff_ms(3), 3000);
        assert_eq!(policy.backoff_ms(7), 5000);
        assert_eq!(policy.backoff_ms(u32::MAX), 5000);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_second_attempt() {
        let mut attempt_count = 0;

        let result = retry_async(&fast_policy(3), "test_op", || {
            attempt_count += 1;
            let n = attempt_count;
            async move {
                if n < 2 {
                    return Err(unavailable(Some(503)));
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count, 2);
    }

    #[tokio::test]
    async fn test_retry_fails_after_max_attempts() {
        let mut attempt_count = 0;

        let result: Result<i32, _> = retry_async(&fast_policy(3), "test_op", || {
            attempt_count += 1;
            async move { Err(unavailable(None)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let mut attempt_count = 0;

        let result: Result<i32, _> = retry_async(&fast_policy(5), "test_op", || {
            attempt_count += 1;
            async move { Err(unavailable(Some(404))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count, 1);
    }

    #[tokio::test]
    async fn test_validation_errors_are_not_retried() {
        let mut attempt_count = 0;

        let result: Result<i32, _> = retry_async(&fast_policy(5), "test_op", || {
            attempt_count += 1;
            async move { Err(ReconcileError::Storage("locked".into())) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), "storage");
        assert_eq!(attempt_count, 1);
    }
}
