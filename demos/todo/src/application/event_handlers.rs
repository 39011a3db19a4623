//! Notification handlers reacting to todo events.

use crate::domain::{TodoItemCompletedEvent, TodoItemCreatedEvent, TodoItemDeletedEvent};
use tidy_core::{CancellationToken, DomainEvent, HandlerError, NotificationHandler};
use tidy_runtime::DispatcherBuilder;

/// Writes every event it receives to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDomainEvent;

impl<E: DomainEvent> NotificationHandler<E> for LogDomainEvent {
    async fn handle(&self, event: &E, _cancellation: &CancellationToken) -> Result<(), HandlerError> {
        tracing::info!(
            domain_event = event.event_name(),
            detail = ?event,
            "Domain event"
        );
        Ok(())
    }
}

/// Register the application's handlers.
#[must_use]
pub fn register_handlers(builder: DispatcherBuilder) -> DispatcherBuilder {
    builder
        .register::<TodoItemCreatedEvent, _>(LogDomainEvent)
        .register::<TodoItemCompletedEvent, _>(LogDomainEvent)
        .register::<TodoItemDeletedEvent, _>(LogDomainEvent)
}
