//! Capped exponential backoff with jitter around a single logical attempt.
//!
//! The retrier is deliberately ignorant of HTTP: it sees an opaque
//! `Result<T, E>` from the attempt closure and a `should_retry` predicate
//! supplied by the caller. `loadgate_core::services::dispatch` is the only
//! caller and supplies [`crate::models::error::GatewayError::is_retryable`].

use log::warn;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Attempt budget actually used: disabled mode collapses to a single try.
    fn effective_max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Backoff before attempt `k+1`, 1-indexed `k`. Capped AFTER jitter, so
    /// `max_backoff` is a true ceiling regardless of the [0.75, 1.25] draw.
    fn backoff_for(&self, k: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64 * 2f64.powi((k - 1) as i32);
        let raw_ms = base_ms.min(self.max_backoff.as_millis() as f64);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        let jittered_ms = (raw_ms * jitter).min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(jittered_ms.round() as u64)
    }
}

/// Runs `attempt` up to `config.max_attempts` times, sleeping a capped,
/// jittered exponential backoff between attempts. Stops early the moment
/// `should_retry` returns false for an error, or `attempt` succeeds.
pub async fn do_with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.effective_max_attempts();
    let mut last_err = None;

    for k in 1..=max_attempts {
        match attempt(k).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = should_retry(&err);
                last_err = Some(err);
                if !retryable || k == max_attempts {
                    break;
                }
                let backoff = config.backoff_for(k);
                warn!(
                    "attempt {}/{} failed, retrying after {:?}",
                    k, max_attempts, backoff
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn succeeds_immediately_without_retry() {
        let config = RetryConfig::default();
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = do_with_retry(
            &config,
            |_: &&str| true,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let config = RetryConfig {
            enabled: true,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(50),
        };
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<u32, &str> = do_with_retry(
            &config,
            |_: &&str| true,
            |_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn disabled_retry_tries_once_even_on_failure() {
        let config = RetryConfig {
            enabled: false,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = do_with_retry(
            &config,
            |_: &&str| true,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("always fails") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_retry_false_stops_early() {
        let config = RetryConfig {
            enabled: true,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = do_with_retry(
            &config,
            |_: &&str| false,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("not retryable") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_never_exceeds_max_after_jitter() {
        let config = RetryConfig {
            enabled: true,
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(150),
        };
        for k in 1..=10 {
            let b = config.backoff_for(k);
            assert!(b <= config.max_backoff, "backoff {:?} exceeded cap", b);
        }
    }
}
