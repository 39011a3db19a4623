//! Exception boundary.
//!
//! Outermost stage of the pipeline. Every failure raised further in, a
//! panic or an [`AppError`](crate::AppError) with a 5xx status, is logged
//! here and turned into the generic `500` structured error body.
//!
//! The boundary also owns the per-request [`CancellationToken`]: it is inserted into the
//! request extensions and cancelled if the response future is dropped before
//! completing (client disconnect).

use crate::error::{ErrorResponse, Fault, GENERIC_ERROR_MESSAGE};
use axum::{
    Json,
    extract::Request,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use tidy_core::CancellationToken;
use tidy_runtime::metrics::PipelineMetrics;
use tower::{Layer, Service};

/// Layer installing the exception boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExceptionBoundaryLayer;

impl ExceptionBoundaryLayer {
    /// Create the layer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ExceptionBoundaryLayer {
    type Service = ExceptionBoundary<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionBoundary { inner }
    }
}

/// Middleware service converting faults into generic error responses.
#[derive(Clone, Debug)]
pub struct ExceptionBoundary<S> {
    inner: S,
}

impl<S> Service<Request> for ExceptionBoundary<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let cancellation = CancellationToken::new();
        req.extensions_mut().insert(cancellation.clone());

        let inner = &mut self.inner;
        let future = panic::catch_unwind(AssertUnwindSafe(move || inner.call(req)));

        Box::pin(async move {
            let guard = cancellation.drop_guard();

            let outcome = match future {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(payload) => Err(payload),
            };

            let response = match outcome {
                Ok(Ok(response)) => inspect(response, &method, &path),
                Ok(Err(never)) => match never {},
                Err(payload) => {
                    PipelineMetrics::record_fault("panic");
                    tracing::error!(
                        method = %method,
                        path = %path,
                        panic = panic_message(payload.as_ref()),
                        "Unhandled panic while processing request"
                    );
                    generic_response()
                }
            };

            guard.disarm();
            Ok(response)
        })
    }
}

/// Log a fault carried by `response` and strip it down to the generic body.
fn inspect(response: Response, method: &Method, path: &str) -> Response {
    let Some(fault) = response.extensions().get::<Fault>() else {
        return response;
    };

    PipelineMetrics::record_fault("error");
    match &fault.source {
        Some(source) => tracing::error!(
            method = %method,
            path = %path,
            code = %fault.code,
            error = %fault.message,
            source = ?source,
            "Request failed"
        ),
        None => tracing::error!(
            method = %method,
            path = %path,
            code = %fault.code,
            error = %fault.message,
            "Request failed"
        ),
    }

    generic_response()
}

fn generic_response() -> Response {
    let body = ErrorResponse {
        code: "INTERNAL_SERVER_ERROR".to_string(),
        message: GENERIC_ERROR_MESSAGE.to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use crate::AppError;
    use crate::extractors::RequestCancellation;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(path: &str) -> Request {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_successful_response_passes_through() {
        let app = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .layer(ExceptionBoundaryLayer::new());

        let response = app.oneshot(request("/ok")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "fine");
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_500() {
        async fn explode() -> &'static str {
            panic!("connection string leaked");
        }

        let app = Router::new()
            .route("/boom", get(explode))
            .layer(ExceptionBoundaryLayer::new());

        let response = app.oneshot(request("/boom")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await;
        assert!(text.contains(GENERIC_ERROR_MESSAGE));
        assert!(!text.contains("connection string"));
    }

    #[tokio::test]
    async fn test_app_error_fault_is_stripped() {
        let app = Router::new()
            .route(
                "/fail",
                get(|| async {
                    Err::<(), _>(AppError::new(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "replica lag 40s".to_string(),
                        "SERVICE_UNAVAILABLE".to_string(),
                    ))
                }),
            )
            .layer(ExceptionBoundaryLayer::new());

        let response = app.oneshot(request("/fail")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<Fault>().is_none());
        let text = body_text(response).await;
        assert!(text.contains("INTERNAL_SERVER_ERROR"));
        assert!(!text.contains("replica"));
    }

    #[tokio::test]
    async fn test_client_errors_are_untouched() {
        let app = Router::new()
            .route(
                "/missing",
                get(|| async { Err::<(), _>(AppError::not_found("TodoList", 7)) }),
            )
            .layer(ExceptionBoundaryLayer::new());

        let response = app.oneshot(request("/missing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("TodoList with id 7 not found"));
    }

    #[tokio::test]
    async fn test_token_is_live_while_handler_runs() {
        async fn probe(RequestCancellation(token): RequestCancellation) -> &'static str {
            if token.is_cancelled() { "cancelled" } else { "live" }
        }

        let app = Router::new()
            .route("/token", get(probe))
            .layer(ExceptionBoundaryLayer::new());

        let response = app.oneshot(request("/token")).await.unwrap();

        assert_eq!(body_text(response).await, "live");
    }
}
