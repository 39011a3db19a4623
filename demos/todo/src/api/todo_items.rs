//! Todo item endpoints.
//!
//! - GET /api/TodoItems?listId=&pageNumber=&pageSize= - One page of a list's items
//! - POST /api/TodoItems - Create an item
//! - PUT /api/TodoItems/:id - Change title and done flag
//! - PUT /api/TodoItems/UpdateDetail/:id - Change list, priority and note
//! - DELETE /api/TodoItems/:id - Delete an item

use super::{AppState, context};
use crate::application::{
    CreateTodoItem, GetTodoItems, PaginatedList, TodoItemBriefDto, UpdateTodoItem,
    UpdateTodoItemDetail,
};
use crate::domain::TodoItemId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tidy_web::AppError;
use tidy_web::extractors::{CurrentUser, RequestCancellation};

/// One page of a list's items.
///
/// # Errors
///
/// 422 for a page number or size below 1.
pub async fn get_todo_items(
    State(state): State<AppState>,
    Query(query): Query<GetTodoItems>,
) -> Result<Json<PaginatedList<TodoItemBriefDto>>, AppError> {
    Ok(Json(state.todos.get_todo_items(query).await?))
}

/// Create an item and return its id.
///
/// # Errors
///
/// 404 for an unknown list, 422 for an invalid title.
pub async fn create_todo_item(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Json(command): Json<CreateTodoItem>,
) -> Result<(StatusCode, Json<TodoItemId>), AppError> {
    let id = state
        .todos
        .create_todo_item(command, &context(user, cancellation))
        .await?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// Change an item's title and done flag.
///
/// Marking an open item done notifies the completion handlers before the
/// response is sent.
///
/// # Errors
///
/// 400 when the path and body ids differ, 404 for an unknown item, 422 for
/// an invalid title, 500 if a completion handler fails.
pub async fn update_todo_item(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Path(id): Path<TodoItemId>,
    Json(command): Json<UpdateTodoItem>,
) -> Result<StatusCode, AppError> {
    if id != command.id {
        return Err(AppError::bad_request("Route id does not match body id"));
    }
    state
        .todos
        .update_todo_item(command, &context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change an item's list, priority and note.
///
/// # Errors
///
/// 400 when the path and body ids differ, 404 for an unknown item or list.
pub async fn update_todo_item_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Path(id): Path<TodoItemId>,
    Json(command): Json<UpdateTodoItemDetail>,
) -> Result<StatusCode, AppError> {
    if id != command.id {
        return Err(AppError::bad_request("Route id does not match body id"));
    }
    state
        .todos
        .update_todo_item_detail(command, &context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an item.
///
/// # Errors
///
/// 404 for an unknown item.
pub async fn delete_todo_item(
    State(state): State<AppState>,
    user: CurrentUser,
    cancellation: RequestCancellation,
    Path(id): Path<TodoItemId>,
) -> Result<StatusCode, AppError> {
    state
        .todos
        .delete_todo_item(id, &context(user, cancellation))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
