//! Bounded retry for optimistic-concurrency conflicts.
//!
//! A target update is a read-modify-write. When another writer changes the
//! resource between our read and our write, the API server rejects the write
//! with 409 Conflict. The whole read-modify-write is then re-run with
//! exponential backoff and jitter, up to `max_attempts` times. Any other error
//! is returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::error::Result;

/// Retry budget for conflicting writes.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (values below 1 mean 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retry without sleeping between attempts
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Single attempt, conflicts are reported as-is
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }
}

/// Run `operation` until it succeeds, fails with a non-conflict error, or
/// the attempt budget is spent.
pub async fn retry_on_conflict<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_conflict() => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Conflict persisted after max attempts"
                    );
                    return Err(e);
                }

                // 0.5x to 1.5x of the delay
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = jittered_delay.as_millis(),
                    "Write conflicted, retrying with a fresh read"
                );

                tokio::time::sleep(jittered_delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
