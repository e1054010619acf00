// Interval rate limiter for search API calls.
//
// Requests are spaced at least `1 / qps` seconds apart. Each caller reserves
// the next free slot under the lock, then sleeps outside it, so concurrent
// searches still keep the spacing.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Slowest supported spacing between two requests.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct RateLimiter {
    interval: Duration,
    /// Start time of the most recently reserved slot
    last_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter that allows `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Result<Self> {
        Ok(Self {
            interval: Self::interval_for(requests_per_second)?,
            last_slot: Arc::new(Mutex::new(None)),
        })
    }

    /// Spacing between requests at `requests_per_second`.
    ///
    /// Fails for zero, negative, NaN, or rates slower than one request a day.
    pub fn interval_for(requests_per_second: f64) -> Result<Duration> {
        if requests_per_second.is_nan() || requests_per_second <= 0.0 {
            anyhow::bail!("Search rate must be positive, got {requests_per_second}");
        }
        match Duration::try_from_secs_f64(1.0 / requests_per_second) {
            Ok(interval) if interval <= MAX_INTERVAL => Ok(interval),
            _ => anyhow::bail!(
                "Search rate {requests_per_second} is too slow (at least one request per day)"
            ),
        }
    }

    /// Wait until this caller's slot comes up.
    pub async fn acquire(&self) {
        let slot = {
            let mut last = self.last_slot.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(prev) if prev + self.interval > now => prev + self.interval,
                _ => now,
            };
            *last = Some(slot);
            slot
        };

        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request_immediately() {
        let limiter = RateLimiter::new(1.0).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_delays_second_request() {
        let limiter = RateLimiter::new(2.0).unwrap(); // 500ms between requests
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(400),
            "Expected ~500ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_concurrent_callers() {
        let limiter = RateLimiter::new(10.0).unwrap(); // 100ms between requests
        let start = Instant::now();
        let (a, b, c) = (limiter.clone(), limiter.clone(), limiter.clone());
        tokio::join!(a.acquire(), b.acquire(), c.acquire());
        // Three slots: 0ms, 100ms, 200ms
        assert!(
            start.elapsed() >= Duration::from_millis(180),
            "Expected ~200ms total, got {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn test_interval_for_common_rates() {
        assert_eq!(RateLimiter::interval_for(1.0).unwrap(), Duration::from_secs(1));
        assert_eq!(RateLimiter::interval_for(4.0).unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_rates_rejected_without_panicking() {
        for qps in [0.0, -1.0, f64::NAN, 1e-20, 1e-300, 1e-6] {
            assert!(RateLimiter::new(qps).is_err(), "qps {qps} should be rejected");
        }
    }
}
