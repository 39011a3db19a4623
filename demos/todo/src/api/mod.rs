//! HTTP endpoints.
//!
//! - `/api/TodoLists`: list CRUD and purge
//! - `/api/TodoItems`: item CRUD and paginated listing
//! - `/health`, `/alive`: probes
//! - `/metrics`: Prometheus text, when a recorder is installed

pub mod todo_items;
pub mod todo_lists;

use crate::application::{RequestContext, TodoError, TodoService};
use axum::{
    Router,
    extract::State,
    http::{Method, header},
    response::IntoResponse,
    routing::{get, post, put},
};
use std::sync::Arc;
use tidy_runtime::metrics::MetricsRecorder;
use tidy_web::extractors::{CurrentUser, RequestCancellation};
use tidy_web::handlers::health_routes;
use tidy_web::{AccessRule, AppError, AuthorizationPolicy};

/// Role allowed to purge all lists.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Application service
    pub todos: Arc<TodoService>,
    /// Installed metrics recorder
    pub metrics: Option<Arc<MetricsRecorder>>,
}

/// Access rules for the endpoints below, first match wins.
#[must_use]
pub fn authorization_policy() -> AuthorizationPolicy {
    AuthorizationPolicy::new()
        .rule_for(
            Method::POST,
            "/api/TodoLists/purge",
            AccessRule::Role(ADMINISTRATOR_ROLE.to_string()),
        )
        .rule("/api", AccessRule::Authenticated)
        .rule("/health", AccessRule::Anonymous)
        .rule("/alive", AccessRule::Anonymous)
        .rule("/metrics", AccessRule::Anonymous)
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/TodoLists",
            get(todo_lists::get_todo_lists).post(todo_lists::create_todo_list),
        )
        .route("/TodoLists/purge", post(todo_lists::purge_todo_lists))
        .route(
            "/TodoLists/:id",
            put(todo_lists::update_todo_list).delete(todo_lists::delete_todo_list),
        )
        .route(
            "/TodoItems",
            get(todo_items::get_todo_items).post(todo_items::create_todo_item),
        )
        .route(
            "/TodoItems/:id",
            put(todo_items::update_todo_item).delete(todo_items::delete_todo_item),
        )
        .route(
            "/TodoItems/UpdateDetail/:id",
            put(todo_items::update_todo_item_detail),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(render_metrics))
        .merge(health_routes())
        .with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .as_ref()
        .and_then(|recorder| recorder.render())
        .ok_or_else(|| AppError::not_found("Metrics recorder", "default"))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

fn context(
    CurrentUser(user): CurrentUser,
    RequestCancellation(token): RequestCancellation,
) -> RequestContext {
    RequestContext::new(user, token)
}

impl From<TodoError> for AppError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::NotFound { entity, id } => Self::not_found(entity, id),
            TodoError::Validation(errors) => Self::validation(errors.join(" ")),
            TodoError::Persistence(source) => Self::from(source),
            TodoError::Dispatch(source) => Self::from(source),
            TodoError::Cancelled => Self::internal("Request was cancelled"),
        }
    }
}
