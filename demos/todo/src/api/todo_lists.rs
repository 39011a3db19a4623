//! Todo list endpoints.
//!
//! - GET /api/TodoLists - All lists with their items
//! - POST /api/TodoLists - Create a list
//! - PUT /api/TodoLists/:id - Rename a list
//! - DELETE /api/TodoLists/:id - Delete a list and its items
//! - POST /api/TodoLists/purge - Delete everything (administrators)

use super::{AppState, context};
use crate::application::{CreateTodoList, TodosVm, UpdateTodoList};
use crate::domain::TodoListId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tidy_web::AppError;
use tidy_web::extractors::{CurrentUser, RequestCancellation};

/// All lists.
///
/// # Errors
///
/// 500 if the database fails.
pub async fn get_todo_lists(State(state): State<AppState>) -> Result<Json<TodosVm>, AppError> {
    Ok(Json(state.todos.get_todos().await?))
}

/// Create a list and return its id.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/TodoLists \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Groceries", "colour": "#CCFF99"}'
/// ```
///
/// # Errors
///
/// 422 for an invalid or duplicate title.
pub async fn create_todo_list(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Json(command): Json<CreateTodoList>,
) -> Result<(StatusCode, Json<TodoListId>), AppError> {
    let id = state
        .todos
        .create_todo_list(command, &context(user, cancellation))
        .await?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// Rename a list.
///
/// # Errors
///
/// 400 when the path and body ids differ, 404 for an unknown list, 422 for
/// an invalid title.
pub async fn update_todo_list(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Path(id): Path<TodoListId>,
    Json(command): Json<UpdateTodoList>,
) -> Result<StatusCode, AppError> {
    if id != command.id {
        return Err(AppError::bad_request("Route id does not match body id"));
    }
    state
        .todos
        .update_todo_list(command, &context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a list.
///
/// # Errors
///
/// 404 for an unknown list.
pub async fn delete_todo_list(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Path(id): Path<TodoListId>,
) -> Result<StatusCode, AppError> {
    state
        .todos
        .delete_todo_list(id, &context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every list.
///
/// # Errors
///
/// 500 if the database fails.
pub async fn purge_todo_lists(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
) -> Result<StatusCode, AppError> {
    state
        .todos
        .purge_todo_lists(&context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
