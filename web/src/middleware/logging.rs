//! Development request logging.

use axum::{extract::Request, middleware::Next, response::Response};

/// Log each request on the way in and its status on the way out.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    tracing::info!(method = %method, path = %path, "→ {method} {path}");

    let response = next.run(request).await;

    let status = response.status().as_u16();
    tracing::info!(method = %method, path = %path, status, "← {status}");
    response
}
