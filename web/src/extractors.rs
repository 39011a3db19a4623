//! Custom Axum extractors.
//!
//! This module contains custom extractors for the values the pipeline
//! attaches to a request:
//! - `CurrentUser`: the principal set by authentication, if any
//! - `RequestCancellation`: the token cancelled when the request is aborted
//!
//! # Examples
//!
//! ```ignore
//! use tidy_web::extractors::{CurrentUser, RequestCancellation};
//!
//! async fn handler(
//!     CurrentUser(user): CurrentUser,
//!     RequestCancellation(cancellation): RequestCancellation,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(user = ?user.as_ref().map(|u| u.name()), "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use std::convert::Infallible;
use tidy_core::{CancellationToken, Principal};

/// The caller's principal, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}

/// Cancellation token for the current request.
///
/// Cancelled by the exception boundary when the client goes away before the
/// response is produced. Outside the pipeline a fresh, never-cancelled token
/// is returned.
#[derive(Debug, Clone)]
pub struct RequestCancellation(pub CancellationToken);

#[async_trait]
impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .extensions
            .get::<CancellationToken>()
            .cloned()
            .unwrap_or_else(CancellationToken::new);
        Ok(Self(token))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_current_user() {
        let mut req = Request::builder().body(()).expect("Valid request");
        req.extensions_mut().insert(Principal::new("alice"));

        let (mut parts, _) = req.into_parts();
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(user.map(|u| u.name().to_string()), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_request_cancellation_defaults_to_live_token() {
        let req = Request::builder().body(()).expect("Valid request");

        let (mut parts, _) = req.into_parts();
        let RequestCancellation(token) = RequestCancellation::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert!(!token.is_cancelled());
    }
}
