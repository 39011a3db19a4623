//! In-process notification dispatch.
//!
//! The [`NotificationDispatcher`] routes a published [`DomainEvent`] to every
//! [`NotificationHandler`] registered for the event's concrete type.
//!
//! # Semantics
//!
//! - Handlers run sequentially, in registration order, inside the
//!   publishing task. `publish` returns only once every handler ran or one
//!   failed.
//! - The first failure stops the remaining handlers and is returned to the
//!   publisher. Side effects of handlers that already ran are kept.
//! - Nothing is persisted, retried or redelivered.
//! - The cancellation token is checked before every handler.
//!
//! # Registration
//!
//! Registrations are collected by a [`DispatcherBuilder`] at startup and
//! frozen by [`DispatcherBuilder::build`]. The built dispatcher is immutable,
//! so publishing needs no locks and can be shared through an `Arc`.
//!
//! # Example
//!
//! ```
//! use tidy_core::{CancellationToken, DomainEvent, HandlerError, NotificationHandler};
//! use tidy_runtime::dispatcher::NotificationDispatcher;
//!
//! #[derive(Debug)]
//! struct Completed;
//!
//! impl DomainEvent for Completed {
//!     fn event_name(&self) -> &'static str {
//!         "Completed"
//!     }
//! }
//!
//! struct Log;
//!
//! impl NotificationHandler<Completed> for Log {
//!     async fn handle(&self, _: &Completed, _: &CancellationToken) -> Result<(), HandlerError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = NotificationDispatcher::builder().register(Log).build();
//! dispatcher.publish(&Completed, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use crate::metrics::DispatcherMetrics;
use futures::future::BoxFuture;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tidy_core::{CancellationToken, DomainEvent, HandlerError, NotificationHandler};

/// Errors returned by [`NotificationDispatcher::publish`].
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A handler failed; handlers registered after it did not run.
    #[error("Handler '{handler}' failed for event '{event}': {source}")]
    HandlerFailed {
        /// Name of the published event
        event: &'static str,
        /// Type name of the failing handler
        handler: &'static str,
        /// The handler's error
        #[source]
        source: HandlerError,
    },

    /// The request was cancelled before all handlers ran.
    #[error("Dispatch of event '{event}' was cancelled")]
    Cancelled {
        /// Name of the published event
        event: &'static str,
    },
}

/// Object-safe view of a typed handler.
trait ErasedHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &'a self,
        event: &'a (dyn Any + Send + Sync),
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}

struct TypedHandler<E, H> {
    handler: H,
    _event: PhantomData<fn(&E)>,
}

impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: DomainEvent,
    H: NotificationHandler<E>,
{
    fn name(&self) -> &'static str {
        type_name::<H>()
    }

    fn handle<'a>(
        &'a self,
        event: &'a (dyn Any + Send + Sync),
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        // Registration is keyed by TypeId::of::<E>(), so the downcast only
        // fails if the map was corrupted.
        match event.downcast_ref::<E>() {
            Some(event) => Box::pin(self.handler.handle(event, cancellation)),
            None => Box::pin(async {
                Err(HandlerError::failed(format!(
                    "event routed to handler expecting {}",
                    type_name::<E>()
                )))
            }),
        }
    }
}

/// Collects handler registrations before the dispatcher is built.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<TypeId, Vec<Arc<dyn ErasedHandler>>>,
}

impl DispatcherBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`.
    ///
    /// Handlers for the same event type run in the order they were
    /// registered.
    #[must_use]
    pub fn register<E, H>(mut self, handler: H) -> Self
    where
        E: DomainEvent,
        H: NotificationHandler<E>,
    {
        self.handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Arc::new(TypedHandler {
                handler,
                _event: PhantomData,
            }));
        self
    }

    /// Freeze the registrations.
    #[must_use]
    pub fn build(self) -> NotificationDispatcher {
        tracing::debug!(
            event_types = self.handlers.len(),
            handlers = self.handlers.values().map(Vec::len).sum::<usize>(),
            "Notification dispatcher built"
        );
        NotificationDispatcher {
            handlers: self.handlers,
        }
    }
}

/// Routes published events to their registered handlers.
pub struct NotificationDispatcher {
    handlers: HashMap<TypeId, Vec<Arc<dyn ErasedHandler>>>,
}

impl NotificationDispatcher {
    /// Start collecting registrations.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Number of handlers registered for `E`.
    #[must_use]
    pub fn handler_count<E: DomainEvent>(&self) -> usize {
        self.handlers.get(&TypeId::of::<E>()).map_or(0, Vec::len)
    }

    /// Publish `event` to every handler registered for its type.
    ///
    /// Publishing an event nobody subscribed to is a no-op.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::HandlerFailed`] with the first failing handler;
    ///   later handlers are not invoked.
    /// - [`DispatchError::Cancelled`] if `cancellation` fires before a
    ///   handler starts.
    pub async fn publish<E: DomainEvent>(
        &self,
        event: &E,
        cancellation: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let event_name = event.event_name();
        DispatcherMetrics::record_publish(event_name);
        let Some(handlers) = self.handlers.get(&TypeId::of::<E>()) else {
            tracing::trace!(event = event_name, "No handlers registered");
            return Ok(());
        };

        let erased: &(dyn Any + Send + Sync) = event;
        for handler in handlers {
            if cancellation.is_cancelled() {
                tracing::debug!(event = event_name, "Dispatch cancelled");
                return Err(DispatchError::Cancelled { event: event_name });
            }

            tracing::debug!(
                event = event_name,
                handler = handler.name(),
                "Invoking notification handler"
            );

            if let Err(source) = handler.handle(erased, cancellation).await {
                DispatcherMetrics::record_failure(event_name);
                tracing::warn!(
                    event = event_name,
                    handler = handler.name(),
                    error = %source,
                    "Notification handler failed"
                );
                return Err(DispatchError::HandlerFailed {
                    event: event_name,
                    handler: handler.name(),
                    source,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("event_types", &self.handlers.len())
            .finish()
    }
}
