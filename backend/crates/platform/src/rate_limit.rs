//! Rate Limiting Infrastructure
//!
//! Fixed-window counter per caller key. Bursts of up to twice the limit are
//! possible across a window boundary.
//!
//! State is local to one process. Multiple API instances each keep their own
//! buckets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    fn open() -> Self {
        Self {
            allowed: true,
            remaining: u32::MAX,
            reset_at_ms: 0,
        }
    }

    /// Seconds until the window resets, for a `Retry-After` header
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_at_ms - now_ms).max(0);
        (wait_ms as u64).div_ceil(1000)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    token_count: u32,
    window_started_at_ms: i64,
    window_ms: i64,
}

/// In-memory fixed-window limiter
pub struct FixedWindowRateLimiter {
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FixedWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("buckets", &self.len())
            .finish()
    }
}

impl FixedWindowRateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Current time as seen by this limiter
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        // A panic while holding the lock leaves at worst a stale counter.
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consume one token for `key`, returning whether the call is allowed
    pub fn allow(&self, key: &str, limit: u32, window_ms: i64) -> bool {
        self.take(key, limit, window_ms).allowed
    }

    /// Same as [`allow`](Self::allow) but with remaining/reset information
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.take(key, config.max_requests, config.window_ms())
    }

    fn take(&self, key: &str, limit: u32, window_ms: i64) -> RateLimitResult {
        if key.is_empty() || window_ms <= 0 {
            tracing::debug!(key, window_ms, "Rate limiter bypassed for malformed input");
            return RateLimitResult::open();
        }

        let now = self.clock.now_ms();
        let mut buckets = self.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            token_count: 0,
            window_started_at_ms: now,
            window_ms,
        });

        if now - bucket.window_started_at_ms > window_ms {
            bucket.token_count = 0;
            bucket.window_started_at_ms = now;
            bucket.window_ms = window_ms;
        }

        let reset_at_ms = bucket.window_started_at_ms.saturating_add(window_ms);

        if bucket.token_count >= limit {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        bucket.token_count += 1;
        bucket.window_ms = window_ms;
        RateLimitResult {
            allowed: true,
            remaining: limit - bucket.token_count,
            reset_at_ms,
        }
    }

    /// Drop buckets whose window has elapsed, returning how many were removed
    ///
    /// A removed bucket behaves exactly like one that would reset on its next
    /// call, so this never changes what `allow` returns.
    pub fn prune_idle(&self) -> usize {
        let now = self.clock.now_ms();
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now - b.window_started_at_ms <= b.window_ms);
        before - buckets.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (Arc<ManualClock>, FixedWindowRateLimiter) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let limiter = FixedWindowRateLimiter::with_clock(clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_fourth_call_in_window_is_denied() {
        let (_, limiter) = limiter();
        let results: Vec<bool> = (0..4).map(|_| limiter.allow("route:ip1", 3, 1000)).collect();
        assert_eq!(results, vec![true, true, true, false]);
    }

    #[test]
    fn test_window_resets_after_elapsed() {
        let (clock, limiter) = limiter();
        for _ in 0..3 {
            assert!(limiter.allow("k", 3, 1000));
        }
        assert!(!limiter.allow("k", 3, 1000));

        // exactly window_ms is still the same window
        clock.advance_ms(1000);
        assert!(!limiter.allow("k", 3, 1000));

        clock.advance_ms(1);
        let result = limiter.check("k", &RateLimitConfig { max_requests: 3, window: Duration::from_secs(1) });
        assert!(result.allowed);
        // counter restarted at 1
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn test_denial_does_not_extend_window() {
        let (clock, limiter) = limiter();
        assert!(limiter.allow("k", 1, 1000));
        clock.advance_ms(600);
        assert!(!limiter.allow("k", 1, 1000));
        clock.advance_ms(401);
        assert!(limiter.allow("k", 1, 1000));
    }

    #[test]
    fn test_denied_call_leaves_bucket_window_alone() {
        let (clock, limiter) = limiter();
        assert!(limiter.allow("k", 1, 1000));
        clock.advance_ms(500);
        assert!(!limiter.allow("k", 1, 60_000));

        // the bucket still expires on the window of its last admitted call
        clock.advance_ms(501);
        assert_eq!(limiter.prune_idle(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let (_, limiter) = limiter();
        assert!(limiter.allow("login:1.1.1.1", 1, 1000));
        assert!(!limiter.allow("login:1.1.1.1", 1, 1000));
        assert!(limiter.allow("login:2.2.2.2", 1, 1000));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_fails_open_on_malformed_input() {
        let (_, limiter) = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("", 1, 1000));
            assert!(limiter.allow("k", 1, 0));
            assert!(limiter.allow("k", 1, -5));
        }
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_zero_limit_denies() {
        let (_, limiter) = limiter();
        assert!(!limiter.allow("k", 0, 1000));
    }

    #[test]
    fn test_check_reports_remaining_and_reset() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::new(2, 60);
        let start = clock.now_ms();

        let first = limiter.check("k", &config);
        assert_eq!(first, RateLimitResult { allowed: true, remaining: 1, reset_at_ms: start + 60_000 });

        limiter.check("k", &config);
        let denied = limiter.check("k", &config);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs(start + 30_500), 30);
    }

    #[test]
    fn test_prune_idle_removes_only_elapsed_buckets() {
        let (clock, limiter) = limiter();
        limiter.allow("short", 5, 1_000);
        limiter.allow("long", 5, 60_000);

        clock.advance_ms(5_000);
        assert_eq!(limiter.prune_idle(), 1);
        assert_eq!(limiter.len(), 1);

        // the surviving bucket still counts
        for _ in 0..4 {
            assert!(limiter.allow("long", 5, 60_000));
        }
        assert!(!limiter.allow("long", 5, 60_000));
    }

    #[test]
    fn test_concurrent_calls_never_exceed_limit() {
        let limiter = Arc::new(FixedWindowRateLimiter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..50).filter(|_| limiter.allow("shared", 100, 60_000)).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 100);
    }
}
