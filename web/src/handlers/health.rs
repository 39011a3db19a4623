//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health. Neither checks dependencies.

use axum::{Router, http::StatusCode, routing::get};

/// Readiness probe.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Healthy")
}

/// Liveness probe.
///
/// # Endpoint
///
/// ```text
/// GET /alive
/// ```
#[allow(clippy::unused_async)]
pub async fn alive() -> (StatusCode, &'static str) {
    (StatusCode::OK, "Healthy")
}

/// Router serving `/health` and `/alive`.
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/alive", get(alive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Healthy");
    }

    #[tokio::test]
    async fn test_alive() {
        let (status, _) = alive().await;
        assert_eq!(status, StatusCode::OK);
    }
}
