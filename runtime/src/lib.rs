//! # Tidy Runtime
//!
//! Runtime implementations for the Tidy request-processing core.
//!
//! ## Core Components
//!
//! - **Notification Dispatcher**: routes domain events to their handlers,
//!   sequentially and in registration order ([`dispatcher`])
//! - **Rate Limiter**: partitioned fixed-window admission control
//!   ([`rate_limiter`])
//! - **Metrics**: Prometheus counters for both ([`metrics`])
//!
//! ## Example
//!
//! ```ignore
//! use tidy_runtime::{FixedWindowRateLimiter, NotificationDispatcher};
//!
//! let dispatcher = Arc::new(
//!     NotificationDispatcher::builder()
//!         .register::<TodoItemCompletedEvent, _>(TodoItemCompletedEventHandler)
//!         .build(),
//! );
//! dispatcher.publish(&event, &cancellation).await?;
//!
//! let limiter = FixedWindowRateLimiter::new(RateLimitPolicy::default(), Arc::new(SystemClock));
//! if !limiter.check(&key).is_allowed() {
//!     // respond 429
//! }
//! ```

/// Event-type keyed notification dispatch
pub mod dispatcher;

/// Prometheus metrics for observability
pub mod metrics;

/// Partitioned fixed-window rate limiting
pub mod rate_limiter;

pub use dispatcher::{DispatchError, DispatcherBuilder, NotificationDispatcher};
pub use rate_limiter::{FixedWindowRateLimiter, WindowState};
