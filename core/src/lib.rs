//! # Tidy Core
//!
//! Core traits and types for the Tidy request-processing core.
//!
//! This crate holds the abstractions shared by the runtime (dispatcher and
//! rate limiter) and the web pipeline. It performs no I/O.
//!
//! ## Core Concepts
//!
//! - **Domain event**: immutable record of a state transition ([`event::DomainEvent`])
//! - **Notification handler**: reacts to one event type ([`notification::NotificationHandler`])
//! - **Environment**: injected collaborators ([`environment::Clock`],
//!   [`environment::Persistence`], [`environment::IdentityResolver`])
//! - **Rate limit types**: policy, partition key and verdict ([`rate_limit`])
//!
//! ## Architecture Principles
//!
//! - Collaborators are passed in explicitly, never looked up from a global container
//! - Handler registrations are immutable once the process has started
//! - Delivery is synchronous, in-process and per-request
//!
//! ## Example
//!
//! ```
//! use tidy_core::event::DomainEvent;
//! use tidy_core::notification::{HandlerError, NotificationHandler};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct ListRenamed {
//!     title: String,
//! }
//!
//! impl DomainEvent for ListRenamed {
//!     fn event_name(&self) -> &'static str {
//!         "ListRenamed"
//!     }
//! }
//!
//! struct LogRename;
//!
//! impl NotificationHandler<ListRenamed> for LogRename {
//!     async fn handle(&self, event: &ListRenamed, _: &CancellationToken) -> Result<(), HandlerError> {
//!         println!("renamed to {}", event.title);
//!         Ok(())
//!     }
//! }
//! ```

pub mod environment;
pub mod event;
pub mod notification;
pub mod rate_limit;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{
    Clock, Credentials, IdentityError, IdentityResolver, Persistence, PersistenceError, Principal,
    SystemClock,
};
pub use event::DomainEvent;
pub use notification::{HandlerError, NotificationHandler};
pub use rate_limit::{Admission, PartitionKey, RateLimitPolicy};
pub use tokio_util::sync::CancellationToken;
