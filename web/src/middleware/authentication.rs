//! Authentication.
//!
//! Reads `Authorization: Bearer <token>`, asks the [`IdentityResolver`] who
//! it belongs to and attaches the resulting [`Principal`] to the request.
//! Missing or unrecognised credentials leave the request anonymous; the
//! authorization stage decides whether that is acceptable.

use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tidy_core::{Credentials, IdentityResolver};

/// Resolve the caller's principal.
///
/// # Errors
///
/// Returns a 500 [`AppError`] if the identity provider fails.
pub async fn authenticate(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(credentials) = bearer_credentials(request.headers()) {
        match resolver.resolve(&credentials).await? {
            Some(principal) => {
                tracing::debug!(principal = %principal, "Request authenticated");
                request.extensions_mut().insert(principal);
            }
            None => tracing::debug!("Credentials not recognised; continuing anonymously"),
        }
    }

    Ok(next.run(request).await)
}

fn bearer_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(Credentials::Bearer(token.to_string()))
    } else {
        None
    }
}
