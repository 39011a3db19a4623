//! # Tidy Testing
//!
//! Testing utilities and helpers for the Tidy request-processing core.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Identity collaborator doubles ([`identity`])
//! - Notification handler doubles that record or fail ([`handlers`])
//!
//! ## Example
//!
//! ```
//! use tidy_testing::{ManualClock, test_clock};
//! use tidy_core::Clock;
//! use std::time::Duration;
//!
//! let clock = ManualClock::starting_at(test_clock().now());
//! let before = clock.now();
//! clock.advance(Duration::from_secs(61));
//! assert_eq!((clock.now() - before).num_seconds(), 61);
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tidy_core::Clock;

pub mod handlers;
pub mod identity;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, PoisonError, RwLock, TimeDelta, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tidy_testing::mocks::FixedClock;
    /// use tidy_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test advances it.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the component under test.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time = time.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Install a `fmt` tracing subscriber for a test binary.
///
/// Honours `RUST_LOG`; safe to call from every test since repeated
/// installation is ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use handlers::{CallLog, FailingHandler, RecordingHandler};
pub use identity::{FailingIdentityResolver, StaticIdentityResolver};
pub use mocks::{FixedClock, ManualClock, test_clock};
