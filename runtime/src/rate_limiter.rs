//! Partitioned fixed-window rate limiter.
//!
//! Every partition key gets its own counter and window start. A request is
//! admitted while the counter for the current window stays at or below the
//! policy's permit limit; the counter resets hard when the window elapses.
//!
//! # Concurrency
//!
//! Window state lives in a [`DashMap`]. The read-reset-increment-compare
//! sequence for one key runs under that key's shard lock, so concurrent
//! requests sharing a partition are counted exactly and requests on other
//! shards never contend.
//!
//! # Example
//!
//! ```
//! use tidy_core::{Admission, PartitionKey, RateLimitPolicy, SystemClock};
//! use tidy_runtime::rate_limiter::FixedWindowRateLimiter;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let limiter = FixedWindowRateLimiter::new(
//!     RateLimitPolicy::new(2, Duration::from_secs(60)),
//!     Arc::new(SystemClock),
//! );
//! let key = PartitionKey::from("alice");
//!
//! assert!(limiter.check(&key).is_allowed());
//! assert!(limiter.check(&key).is_allowed());
//! assert!(!limiter.check(&key).is_allowed());
//! ```

use crate::metrics::RateLimiterMetrics;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tidy_core::{Admission, Clock, PartitionKey, RateLimitPolicy};

/// Counter state for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests counted in the current window, rejected ones included.
    pub count: u32,
    /// When the current window opened.
    pub window_start: DateTime<Utc>,
}

impl WindowState {
    const fn open(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// Fixed-window limiter keyed by [`PartitionKey`].
pub struct FixedWindowRateLimiter {
    policy: RateLimitPolicy,
    window: TimeDelta,
    windows: DashMap<PartitionKey, WindowState>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    /// Create a limiter enforcing `policy`.
    #[must_use]
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            window: TimeDelta::from_std(policy.window).unwrap_or(TimeDelta::MAX),
            windows: DashMap::new(),
            clock,
        }
    }

    /// The enforced policy.
    #[must_use]
    pub const fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count one request for `key` at the clock's current time.
    pub fn check(&self, key: &PartitionKey) -> Admission {
        self.admit(key, self.clock.now())
    }

    /// Count one request for `key` at `now`.
    ///
    /// The first request for an unseen key always opens a fresh window and
    /// is admitted (unless the permit limit is zero).
    pub fn admit(&self, key: &PartitionKey, now: DateTime<Utc>) -> Admission {
        let mut state = self
            .windows
            .entry(key.clone())
            .or_insert_with(|| WindowState::open(now));

        if self.has_elapsed(&state, now) {
            *state = WindowState::open(now);
        }

        state.count = state.count.saturating_add(1);

        if state.count > self.policy.permit_limit {
            let retry_after = state
                .window_start
                .checked_add_signed(self.window)
                .map_or(Duration::MAX, |end| {
                    (end - now).to_std().unwrap_or(Duration::ZERO)
                });
            let count = state.count;
            drop(state);

            RateLimiterMetrics::record_rejected();
            tracing::warn!(
                partition = %key,
                count,
                permit_limit = self.policy.permit_limit,
                retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                "Rate limit exceeded"
            );
            return Admission::Rejected { retry_after };
        }

        drop(state);
        RateLimiterMetrics::record_admitted();
        Admission::Allowed
    }

    /// Current window state for `key`, if any request was counted.
    #[must_use]
    pub fn window_state(&self, key: &PartitionKey) -> Option<WindowState> {
        self.windows.get(key).map(|state| *state)
    }

    /// Number of tracked partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.windows.len()
    }

    /// Drop partitions whose window has elapsed at `now`.
    ///
    /// A dropped partition behaves exactly like one whose window reset, so
    /// this only reclaims memory. Returns the number of partitions removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, state| !self.has_elapsed(state, now));
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted expired rate limit windows");
        }
        evicted
    }

    /// Drop partitions whose window has elapsed by the limiter's own clock.
    ///
    /// Admission and eviction then agree on the current time.
    pub fn evict_expired_now(&self) -> usize {
        self.evict_expired(self.clock.now())
    }

    /// A window is over once `now` has advanced past its end.
    fn has_elapsed(&self, state: &WindowState, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(state.window_start) > self.window
    }
}

impl std::fmt::Debug for FixedWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("policy", &self.policy)
            .field("partitions", &self.windows.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tidy_core::SystemClock;
    use tidy_testing::FixedClock;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn limiter(permits: u32) -> FixedWindowRateLimiter {
        FixedWindowRateLimiter::new(
            RateLimitPolicy::new(permits, Duration::from_secs(60)),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn test_first_request_for_new_key_is_allowed() {
        let limiter = limiter(100);
        assert_eq!(limiter.admit(&"alice".into(), start()), Admission::Allowed);
        assert_eq!(limiter.partition_count(), 1);
    }

    #[test]
    fn test_request_over_ceiling_is_rejected() {
        let limiter = limiter(100);
        let key = PartitionKey::from("alice");
        let now = start();

        for _ in 0..100 {
            assert!(limiter.admit(&key, now).is_allowed());
        }

        assert_eq!(
            limiter.admit(&key, now + TimeDelta::seconds(15)),
            Admission::Rejected {
                retry_after: Duration::from_secs(45)
            }
        );
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let limiter = limiter(100);
        let key = PartitionKey::from("alice");
        let now = start();

        for _ in 0..150 {
            limiter.admit(&key, now);
        }
        assert!(!limiter.admit(&key, now + TimeDelta::seconds(59)).is_allowed());

        let later = now + TimeDelta::seconds(61);
        assert!(limiter.admit(&key, later).is_allowed());
        assert_eq!(
            limiter.window_state(&key),
            Some(WindowState {
                count: 1,
                window_start: later
            })
        );
    }

    #[test]
    fn test_partitions_do_not_share_quota() {
        let limiter = limiter(100);
        let now = start();

        for _ in 0..100 {
            limiter.admit(&"a".into(), now);
        }

        assert!(!limiter.admit(&"a".into(), now).is_allowed());
        assert!(limiter.admit(&"b".into(), now).is_allowed());
    }

    #[test]
    fn test_evict_expired_keeps_open_windows() {
        let limiter = limiter(10);
        let now = start();
        limiter.admit(&"old".into(), now);
        limiter.admit(&"fresh".into(), now + TimeDelta::seconds(30));

        assert_eq!(limiter.evict_expired(now + TimeDelta::seconds(61)), 1);
        assert!(limiter.window_state(&"fresh".into()).is_some());
        assert!(limiter.window_state(&"old".into()).is_none());
    }

    #[test]
    fn test_window_still_open_at_its_exact_end() {
        let limiter = limiter(1);
        let key = PartitionKey::from("alice");
        let now = start();

        assert!(limiter.admit(&key, now).is_allowed());
        assert_eq!(
            limiter.admit(&key, now + TimeDelta::seconds(60)),
            Admission::Rejected {
                retry_after: Duration::ZERO
            }
        );
        assert!(limiter.admit(&key, now + TimeDelta::milliseconds(60_001)).is_allowed());
    }

    #[test]
    fn test_evict_expired_now_uses_limiter_clock() {
        // Limiter clock well behind the wall clock
        let limiter = FixedWindowRateLimiter::new(
            RateLimitPolicy::new(10, Duration::from_secs(60)),
            Arc::new(FixedClock::new(start())),
        );
        limiter.check(&"alice".into());

        assert_eq!(limiter.evict_expired_now(), 0);
        assert!(limiter.window_state(&"alice".into()).is_some());
        assert_eq!(limiter.evict_expired(Utc::now()), 1);
    }

    #[test]
    fn test_concurrent_requests_are_counted_exactly() {
        let limiter = Arc::new(limiter(1_000));
        let now = start();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|_| limiter.admit(&"shared".into(), now).is_allowed())
                        .count()
                })
            })
            .collect();

        let admitted: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();

        assert_eq!(admitted, 1_000);
        assert_eq!(limiter.window_state(&"shared".into()).unwrap().count, 1_600);
    }

    proptest! {
        #[test]
        fn prop_exactly_ceiling_requests_admitted_per_window(
            permits in 1u32..200,
            extra in 1u32..50,
            offsets in proptest::collection::vec(0i64..60, 1..5),
        ) {
            let limiter = limiter(permits);
            let key = PartitionKey::from("caller");
            let now = start();

            let mut admitted = 0u32;
            for i in 0..permits + extra {
                let offset = offsets[i as usize % offsets.len()];
                if limiter.admit(&key, now + TimeDelta::seconds(offset)).is_allowed() {
                    admitted += 1;
                }
            }

            prop_assert_eq!(admitted, permits);
            prop_assert!(limiter.admit(&key, now + TimeDelta::seconds(120)).is_allowed());
        }
    }
}
