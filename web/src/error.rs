//! Error types for web handlers.
//!
//! This module defines error types that bridge between domain errors
//! and HTTP responses, implementing Axum's `IntoResponse` trait.
//!
//! Client errors (4xx) are rendered as they are. Server errors (5xx) never
//! expose their message: the response carries the generic body and a
//! [`Fault`] extension with the real detail, which the pipeline's exception
//! boundary logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tidy_core::{IdentityError, PersistenceError};
use tidy_runtime::DispatchError;

/// Message every server error is reduced to on the wire.
pub const GENERIC_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application error type for web handlers.
///
/// This type wraps domain errors and provides HTTP-friendly error responses.
/// It implements Axum's `IntoResponse` trait to automatically convert errors
/// into HTTP responses.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Data>, AppError> {
///     let list = find_list(id).await
///         .ok_or_else(|| AppError::not_found("TodoList", id))?;
///     Ok(Json(list))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing for 4xx, operator-facing for 5xx)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (for client error handling).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Detail of a server error, attached to the response for the exception
/// boundary to log.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Error code of the originating [`AppError`].
    pub code: String,
    /// Operator-facing message.
    pub message: String,
    /// Underlying cause, if any.
    pub source: Option<Arc<anyhow::Error>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let body = ErrorResponse {
                code: self.code.clone(),
                message: GENERIC_ERROR_MESSAGE.to_string(),
            };
            let mut response = (self.status, Json(body)).into_response();
            response.extensions_mut().insert(Fault {
                code: self.code,
                message: self.message,
                source: self.source.map(Arc::new),
            });
            return response;
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        Self::internal("Notification dispatch failed").with_source(err.into())
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        Self::internal("Persistence failure").with_source(err.into())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        Self::internal("Identity provider failure").with_source(err.into())
    }
}
