//! Command and query handlers.
//!
//! [`TodoService`] is the application layer: every operation opens a
//! session, validates, stages its changes, commits them with
//! `save_changes` and only then publishes the resulting domain events. An
//! event is therefore never observed for a change that was not stored.
//!
//! If a notification handler fails after the commit, the change stays
//! committed and the failure is returned to the caller.

pub mod commands;
pub mod event_handlers;
pub mod queries;

use crate::store::TodoDatabase;
use std::sync::Arc;
use thiserror::Error;
use tidy_core::{CancellationToken, Clock, DomainEvent, PersistenceError, Principal};
use tidy_runtime::{DispatchError, NotificationDispatcher};

pub use commands::{
    CreateTodoItem, CreateTodoList, UpdateTodoItem, UpdateTodoItemDetail, UpdateTodoList,
};
pub use event_handlers::register_handlers;
pub use queries::{
    GetTodoItems, LookupDto, PaginatedList, TodoItemBriefDto, TodoItemDto, TodoListDto, TodosVm,
};

/// Errors returned by [`TodoService`].
#[derive(Error, Debug)]
pub enum TodoError {
    /// The addressed entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// The request failed validation.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The database failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A notification handler failed after the change was committed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request was cancelled before its changes were committed.
    #[error("Request was cancelled")]
    Cancelled,
}

impl TodoError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Per-request context passed to every operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated caller, if any
    pub user: Option<Principal>,
    /// Cancelled when the caller goes away
    pub cancellation: CancellationToken,
}

impl Default for RequestContext {
    /// Anonymous caller, live token.
    fn default() -> Self {
        Self::new(None, CancellationToken::new())
    }
}

impl RequestContext {
    /// Context for `user` with the given token.
    #[must_use]
    pub const fn new(user: Option<Principal>, cancellation: CancellationToken) -> Self {
        Self { user, cancellation }
    }

    fn user_name(&self) -> Option<&str> {
        self.user.as_ref().map(Principal::name)
    }

    fn ensure_live(&self) -> Result<(), TodoError> {
        if self.cancellation.is_cancelled() {
            Err(TodoError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Todo application service.
pub struct TodoService {
    database: Arc<dyn TodoDatabase>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl TodoService {
    /// Create the service from its collaborators.
    #[must_use]
    pub fn new(
        database: Arc<dyn TodoDatabase>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            database,
            dispatcher,
            clock,
        }
    }

    /// Database sessions are opened from.
    #[must_use]
    pub fn database(&self) -> &Arc<dyn TodoDatabase> {
        &self.database
    }

    async fn publish<E: DomainEvent>(
        &self,
        event: &E,
        context: &RequestContext,
    ) -> Result<(), TodoError> {
        self.dispatcher
            .publish(event, &context.cancellation)
            .await
            .map_err(TodoError::from)
    }
}

fn validate_title(title: &str, errors: &mut Vec<String>) {
    if title.trim().is_empty() {
        errors.push("Title must not be empty.".to_string());
    } else if title.chars().count() > crate::domain::MAX_TITLE_LENGTH {
        errors.push(format!(
            "Title must not exceed {} characters.",
            crate::domain::MAX_TITLE_LENGTH
        ));
    }
}

fn check(errors: Vec<String>) -> Result<(), TodoError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TodoError::Validation(errors))
    }
}
