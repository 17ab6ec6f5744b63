//! Retry policy for optimistic units of work.
//!
//! Only `ConcurrencyConflict` is retried: it means another writer committed
//! first and the whole read-modify-write must run again against fresh state.
//! Every other error is returned on the first attempt.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for conflict retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, conflicts are returned to the caller.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Backoff before retry number `attempt` (1-based), before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }
}

/// Picks a delay in `[delay / 2, delay]` so that racing writers spread out.
fn jittered(delay: Duration) -> Duration {
    let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
    if nanos < 2 {
        return delay;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(nanos / 2..=nanos))
}

/// Runs `operation` until it succeeds, fails with a non-conflict error, or
/// `config.max_attempts` is used up. The last error is returned as-is.
pub async fn retry_on_conflict<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(e) if e.is_conflict() && attempt < config.max_attempts => {
                let delay = jittered(config.delay_for(attempt));
                tracing::debug!(attempt, ?delay, error = %e, "Retrying after write conflict");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> StoreError {
        StoreError::ConcurrencyConflict {
            table: "sequences",
            key: "ORD".to_string(),
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_micros(10),
            max_delay: Duration::from_micros(100),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(10));
        assert_eq!(config.delay_for(2), Duration::from_millis(20));
        assert_eq!(config.delay_for(3), Duration::from_millis(40));
        assert_eq!(config.delay_for(4), Duration::from_millis(50));
        assert_eq!(config.delay_for(60), Duration::from_millis(50));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let delay = Duration::from_millis(8);
        for _ in 0..100 {
            let d = jittered(delay);
            assert!(d >= Duration::from_millis(4) && d <= delay);
        }
    }

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_on_conflict(&fast(), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_on_conflict(&fast(), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = retry_on_conflict(&fast(), || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::EmptyCart("alice".to_string()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::EmptyCart(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
