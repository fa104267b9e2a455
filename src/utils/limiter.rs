//! Global request pacing shared by every outbound E-utilities call.

use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// NCBI allows 10 requests/second with an API key.
pub const INTERVAL_WITH_API_KEY: Duration = Duration::from_millis(100);

/// And 3 requests/second without one.
pub const INTERVAL_NO_API_KEY: Duration = Duration::from_millis(334);

/// Minimum-interval pacer shared across all workers.
///
/// Wraps a direct (un-keyed) GCRA limiter with a burst of one cell, so two
/// grants are never closer together than the configured interval no matter
/// how many tasks are waiting. The underlying clock is monotonic, so
/// wall-clock adjustments cannot shrink the spacing.
///
/// Not a process-wide singleton: each run owns its pacer, handed to the
/// clients by `Arc`, so independent runs in one process pace independently.
pub struct RequestPacer {
    interval: Duration,
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestPacer {
    /// A pacer admitting one request per `interval`. A zero interval
    /// disables pacing entirely.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiter: Quota::with_period(interval).map(RateLimiter::direct),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request slot opens.
    ///
    /// Blocks the calling task (no busy-polling), never fails, and stamps
    /// the grant atomically with respect to all other callers.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn zero_interval_grants_immediately() {
        let pacer = RequestPacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..50 {
            pacer.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn grants_are_spaced_across_tasks() {
        let interval = Duration::from_millis(50);
        let pacer = Arc::new(RequestPacer::new(interval));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pacer = Arc::clone(&pacer);
            handles.push(tokio::spawn(async move {
                pacer.acquire().await;
                Instant::now()
            }));
        }

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        // Grant times are measured after the fact, so allow a little skew.
        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(40));
        }
    }
}
