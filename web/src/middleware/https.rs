//! HTTPS redirection.
//!
//! Plain-HTTP requests are answered with `307 Temporary Redirect` to the
//! same host, path and query on the configured HTTPS port. The scheme seen
//! by a reverse proxy (`X-Forwarded-Proto`) takes precedence over the
//! request URI. Without a configured port the stage passes everything
//! through.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// State of the redirection stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpsRedirect {
    port: Option<u16>,
}

impl HttpsRedirect {
    /// Redirect to `port`, or never when `None`.
    #[must_use]
    pub const fn new(port: Option<u16>) -> Self {
        Self { port }
    }
}

/// Redirect non-HTTPS requests.
pub async fn redirect_to_https(
    State(redirect): State<HttpsRedirect>,
    request: Request,
    next: Next,
) -> Response {
    let Some(port) = redirect.port else {
        return next.run(request).await;
    };
    if is_https(&request) {
        return next.run(request).await;
    }

    match https_location(&request, port) {
        Some(location) => {
            tracing::debug!(location = %location, "Redirecting to HTTPS");
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        None => next.run(request).await,
    }
}

fn is_https(request: &Request) -> bool {
    let forwarded = request
        .headers()
        .get("X-Forwarded-Proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(proto) => proto.eq_ignore_ascii_case("https"),
        None => request.uri().scheme_str() == Some("https"),
    }
}

fn https_location(request: &Request, port: u16) -> Option<String> {
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;
    let host = strip_port(authority);
    if host.is_empty() {
        return None;
    }

    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());

    Some(if port == 443 {
        format!("https://{host}{path_and_query}")
    } else {
        format!("https://{host}:{port}{path_and_query}")
    })
}

fn strip_port(authority: &str) -> &str {
    // Bracketed IPv6 literals contain colons of their own.
    if let Some(end) = authority.find(']') {
        return &authority[..=end];
    }
    authority.split(':').next().unwrap_or(authority)
}
