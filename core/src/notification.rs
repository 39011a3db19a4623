//! Notification handler abstraction.
//!
//! A [`NotificationHandler`] reacts to one concrete [`DomainEvent`] type.
//! Handlers are registered once at startup with the runtime's dispatcher
//! and invoked synchronously (in registration order) whenever a command
//! handler publishes a matching event.
//!
//! # Example
//!
//! ```
//! use tidy_core::event::DomainEvent;
//! use tidy_core::notification::{HandlerError, NotificationHandler};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct ItemCompleted {
//!     item_id: u64,
//! }
//!
//! impl DomainEvent for ItemCompleted {
//!     fn event_name(&self) -> &'static str {
//!         "ItemCompleted"
//!     }
//! }
//!
//! struct AuditHandler;
//!
//! impl NotificationHandler<ItemCompleted> for AuditHandler {
//!     async fn handle(
//!         &self,
//!         event: &ItemCompleted,
//!         _cancellation: &CancellationToken,
//!     ) -> Result<(), HandlerError> {
//!         println!("item {} completed", event.item_id);
//!         Ok(())
//!     }
//! }
//! ```

use crate::environment::PersistenceError;
use crate::event::DomainEvent;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a notification handler can report.
///
/// Any error aborts the remaining handlers of the same publish and is
/// propagated to the publisher.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler could not complete its side effect.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// A persistence collaborator used by the handler failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The handler observed cancellation of the enclosing request.
    #[error("Handler cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Create a generic failure with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Reacts to a single concrete domain event type.
///
/// Implementations may be written with `async fn`. The returned future must
/// be `Send` because dispatch happens inside the request task.
///
/// # Cancellation
///
/// The token is cancelled when the originating request is abandoned (the
/// caller disconnected). Long-running handlers should check it and return
/// [`HandlerError::Cancelled`] promptly.
pub trait NotificationHandler<E: DomainEvent>: Send + Sync + 'static {
    /// Handle one published event.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the side effect fails; the dispatcher
    /// stops at the first error.
    fn handle(
        &self,
        event: &E,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}
