use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::resilience::store::{InMemoryRateWindowStore, RateDecision, RateWindowStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// A rate limiter using a sliding window algorithm.
///
/// It tracks request timestamps for each unique key (a clinician or user id)
/// and never admits more than `limit` requests in any trailing `window`.
/// The evict-count-record sequence runs atomically inside the store, so
/// concurrent callers for the same key cannot both slip past the limit.
pub struct RateLimiter {
    store: Arc<dyn RateWindowStore>,
    clock: Arc<dyn Clock>,
    /// The maximum number of requests allowed within the `window`.
    limit: usize,
    /// The duration of the sliding window.
    window: Duration,
}

impl RateLimiter {
    /// Creates a process-local `RateLimiter` on the system clock.
    ///
    /// # Arguments
    ///
    /// * `limit` - The number of requests allowed per `window`.
    /// * `window_secs` - The length of the sliding window in seconds.
    pub fn new(limit: usize, window_secs: u64) -> Self {
        Self::with_parts(
            limit,
            window_secs,
            Arc::new(InMemoryRateWindowStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        limit: usize,
        window_secs: u64,
        store: Arc<dyn RateWindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        RateLimiter {
            store,
            clock,
            limit,
            window: Duration::seconds(window_secs as i64),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Checks if a request from a given key is allowed, recording it if so.
    ///
    /// Returns `(allowed, remaining)`; a rejected call always reports `remaining == 0`.
    pub async fn is_allowed(&self, key: &str) -> Result<RateDecision, AppError> {
        let now = self.clock.now();
        let decision = self.store.admit(key, now, self.window, self.limit).await?;
        if decision.allowed {
            debug!(remaining = decision.remaining, "request admitted");
        } else {
            warn!(limit = self.limit, "rate limit reached");
        }
        Ok(decision)
    }

    /// When the oldest request in the window expires, or `None` if the key has
    /// nothing recorded.
    pub async fn reset_time(&self, key: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        let now = self.clock.now();
        let oldest = self.store.oldest(key, now, self.window).await?;
        Ok(oldest.map(|ts| ts + self.window))
    }

    /// Admits the request or returns `AppError::RateLimited` with the reset hint.
    pub async fn check(&self, key: &str) -> Result<usize, AppError> {
        let decision = self.is_allowed(key).await?;
        if decision.allowed {
            return Ok(decision.remaining);
        }

        let reset_at = self.reset_time(key).await?;
        let retry_after_secs = reset_at
            .map(|at| ceil_secs(at - self.clock.now()))
            .unwrap_or(0);
        Err(AppError::RateLimited {
            limit: self.limit,
            reset_at,
            retry_after_secs,
        })
    }
}

/// Whole seconds, rounded up, clamped at zero.
pub(crate) fn ceil_secs(d: Duration) -> u64 {
    let millis = d.num_milliseconds();
    if millis <= 0 {
        0
    } else {
        ((millis + 999) / 1000) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn limiter(limit: usize, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 26, 9, 0, 0).unwrap(),
        ));
        let limiter = RateLimiter::with_parts(
            limit,
            window_secs,
            Arc::new(InMemoryRateWindowStore::new()),
            clock.clone(),
        );
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_requests_within_limit() {
        let (limiter, _clock) = limiter(5, 3600);
        for expected_remaining in (0..5).rev() {
            let decision = limiter.is_allowed("client1").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        assert_eq!(limiter.is_allowed("client1").await.unwrap(), RateDecision::denied());
    }

    #[tokio::test]
    async fn test_rate_limiter_resets_after_window() {
        let (limiter, clock) = limiter(2, 60);
        assert!(limiter.is_allowed("client2").await.unwrap().allowed);
        assert!(limiter.is_allowed("client2").await.unwrap().allowed);
        assert!(!limiter.is_allowed("client2").await.unwrap().allowed);

        clock.advance(Duration::seconds(61));

        assert!(limiter.is_allowed("client2").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_window_edge_excludes_exact_boundary() {
        let (limiter, clock) = limiter(1, 100);
        assert!(limiter.is_allowed("edge").await.unwrap().allowed);

        // One second short of the window: the first request still counts.
        clock.advance(Duration::seconds(99));
        assert!(!limiter.is_allowed("edge").await.unwrap().allowed);

        // Exactly `window` later the first request falls out.
        clock.advance(Duration::seconds(1));
        assert!(limiter.is_allowed("edge").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(1, 60);
        assert!(limiter.is_allowed("a").await.unwrap().allowed);
        assert!(limiter.is_allowed("b").await.unwrap().allowed);
        assert!(!limiter.is_allowed("a").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_reset_time_is_oldest_plus_window() {
        let (limiter, clock) = limiter(3, 3600);
        assert_eq!(limiter.reset_time("doc").await.unwrap(), None);

        let first = clock.now();
        limiter.is_allowed("doc").await.unwrap();
        clock.advance(Duration::seconds(30));
        limiter.is_allowed("doc").await.unwrap();

        assert_eq!(
            limiter.reset_time("doc").await.unwrap(),
            Some(first + Duration::seconds(3600))
        );
    }

    #[tokio::test]
    async fn test_check_reports_retry_hint() {
        let (limiter, clock) = limiter(1, 600);
        assert_eq!(limiter.check("doc").await.unwrap(), 0);
        clock.advance(Duration::seconds(100));

        let err = limiter.check("doc").await.unwrap_err();
        match err {
            AppError::RateLimited {
                limit,
                reset_at,
                retry_after_secs,
            } => {
                assert_eq!(limit, 1);
                assert!(reset_at.is_some());
                assert_eq!(retry_after_secs, 500);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(Duration::milliseconds(1500)), 2);
        assert_eq!(ceil_secs(Duration::seconds(3)), 3);
        assert_eq!(ceil_secs(Duration::seconds(-4)), 0);
    }
}
