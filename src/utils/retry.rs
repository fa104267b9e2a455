//! Retry with exponential backoff for resilient API calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::HarvestError;

/// Retry policy for one logical request.
///
/// The backoff doubles between attempts and is independent of any request
/// pacing: the pacer bounds the absolute request rate while the backoff
/// bounds how aggressively a single failing request is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub initial_delay: Duration,
    /// Ceiling on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Backoff applied after `attempt` (1-based) has failed:
    /// `initial * 2^(attempt-1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let delay = self.initial_delay.saturating_mul(1u32 << doublings);
        delay.min(self.max_delay)
    }
}

/// Terminal result of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation succeeded on some attempt.
    Success(T),
    /// Transient failures persisted past the attempt ceiling.
    Exhausted {
        attempts: u32,
        last_error: HarvestError,
    },
    /// A failure retrying cannot fix; reported after the first attempt.
    Permanent(HarvestError),
}

/// Run `op` until it succeeds, fails permanently, or exhausts the ceiling.
///
/// Transience is decided by [`HarvestError::is_transient`]. The outcome is
/// a plain value so callers can fold failures into per-item bookkeeping
/// instead of propagating them.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HarvestError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(error) if error.is_transient() => {
                if attempt >= config.max_attempts {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    };
                }
                let delay = config.backoff(attempt);
                tracing::debug!(
                    "attempt {attempt}/{} failed: {error}, retrying in {delay:?}",
                    config.max_attempts
                );
                sleep(delay).await;
            }
            Err(error) => return RetryOutcome::Permanent(error),
        }
    }
}
