//! Fixed-window rate limiting (production only).
//!
//! Each request is charged to a partition: the caller's principal name when
//! one is already attached, else the client IP, else `"anonymous"`. Requests
//! over the window's quota are answered with `429 Too Many Requests` and a
//! `Retry-After` header; they never reach the inner service.
//!
//! The client IP is the TCP peer from [`ConnectInfo`]. `X-Forwarded-For`
//! and `X-Real-IP` are only read when that peer is a configured trusted
//! proxy; otherwise any caller could pick its own partition.

use axum::{
    Json,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tidy_core::{Admission, PartitionKey, Principal};
use tidy_runtime::FixedWindowRateLimiter;
use tower::{Layer, Service};

/// Body of the rejection response.
pub const REJECTION_MESSAGE: &str = "Too many requests. Please try again later.";

#[derive(Debug, Serialize)]
struct Rejection {
    error: &'static str,
}

/// Layer applying a shared [`FixedWindowRateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    limiter: Arc<FixedWindowRateLimiter>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimitLayer {
    /// Create a layer charging requests to `limiter`, trusting no proxy.
    #[must_use]
    pub fn new(limiter: Arc<FixedWindowRateLimiter>) -> Self {
        Self {
            limiter,
            trusted_proxies: Arc::from(Vec::new()),
        }
    }

    /// Peers whose forwarding headers name the real client.
    #[must_use]
    pub fn trusted_proxies(mut self, proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        self.trusted_proxies = proxies.into_iter().collect();
        self
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            limiter: Arc::clone(&self.limiter),
            trusted_proxies: Arc::clone(&self.trusted_proxies),
        }
    }
}

/// Middleware service for rate limiting.
#[derive(Clone, Debug)]
pub struct RateLimit<S> {
    inner: S,
    limiter: Arc<FixedWindowRateLimiter>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl<S> Service<Request> for RateLimit<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let key = partition_key(&req, &self.trusted_proxies);

        match self.limiter.check(&key) {
            Admission::Allowed => Box::pin(self.inner.call(req)),
            Admission::Rejected { retry_after } => {
                tracing::warn!(partition = key.as_str(), "Rate limit exceeded");
                Box::pin(async move { Ok(rejection(retry_after)) })
            }
        }
    }
}

/// Partition a request is charged to.
fn partition_key(req: &Request, trusted_proxies: &[IpAddr]) -> PartitionKey {
    let principal = req.extensions().get::<Principal>().map(Principal::name);
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let origin = peer.map(|peer| client_ip(req.headers(), peer, trusted_proxies));
    PartitionKey::resolve(principal, origin)
}

/// The client behind `peer`.
///
/// Headers are ignored unless `peer` is trusted. `X-Forwarded-For` is
/// walked from the right, skipping trusted hops, so a client cannot prepend
/// an address of its choosing.
fn client_ip(headers: &HeaderMap, peer: IpAddr, trusted_proxies: &[IpAddr]) -> IpAddr {
    if !trusted_proxies.contains(&peer) {
        return peer;
    }

    let forwarded = headers
        .get_all("X-Forwarded-For")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|hop| hop.trim().parse::<IpAddr>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .and_then(|hops| {
            hops.iter()
                .rev()
                .find(|hop| !trusted_proxies.contains(hop))
                .or_else(|| hops.first())
                .copied()
        });

    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).unwrap_or(peer)
}

fn rejection(retry_after: Duration) -> Response {
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(Rejection {
            error: REJECTION_MESSAGE,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(seconds));
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tidy_core::Clock;
    use tidy_core::RateLimitPolicy;
    use tidy_testing::{ManualClock, test_clock};
    use tower::ServiceExt;

    const PROXY: [u8; 4] = [10, 0, 0, 2];

    fn layer(permits: u32, clock: &ManualClock) -> RateLimitLayer {
        let limiter = FixedWindowRateLimiter::new(
            RateLimitPolicy::new(permits, Duration::from_secs(60)),
            Arc::new(clock.clone()),
        );
        RateLimitLayer::new(Arc::new(limiter))
    }

    fn app(layer: RateLimitLayer) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(layer)
    }

    fn from_peer(peer: [u8; 4]) -> Request {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        req
    }

    fn forwarded(peer: [u8; 4], header: &str) -> Request {
        let mut req = from_peer(peer);
        req.headers_mut()
            .insert("X-Forwarded-For", HeaderValue::from_str(header).unwrap());
        req
    }

    fn trusted() -> Vec<IpAddr> {
        vec![IpAddr::from(PROXY)]
    }

    #[tokio::test]
    async fn test_over_quota_is_rejected_with_retry_after() {
        let clock = ManualClock::starting_at(test_clock().now());
        let app = app(layer(2, &clock));

        for _ in 0..2 {
            let response = app.clone().oneshot(from_peer([198, 51, 100, 1])).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        clock.advance(Duration::from_millis(15_500));
        let response = app.oneshot(from_peer([198, 51, 100, 1])).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "45");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": REJECTION_MESSAGE }));
    }

    #[tokio::test]
    async fn test_partitions_by_peer_address() {
        let clock = ManualClock::starting_at(test_clock().now());
        let app = app(layer(1, &clock));

        let first = app.clone().oneshot(from_peer([198, 51, 100, 1])).await.unwrap();
        let other = app.clone().oneshot(from_peer([198, 51, 100, 2])).await.unwrap();
        let again = app.oneshot(from_peer([198, 51, 100, 1])).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(other.status(), StatusCode::OK);
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_shares_the_peer_quota() {
        let clock = ManualClock::starting_at(test_clock().now());
        let app = app(layer(2, &clock));

        let mut admitted = 0;
        for i in 0..10u8 {
            let req = forwarded([198, 51, 100, 7], &format!("10.0.0.{i}"));
            if app.clone().oneshot(req).await.unwrap().status() == StatusCode::OK {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 2);
    }

    #[test]
    fn test_untrusted_peer_headers_are_ignored() {
        let mut req = forwarded([198, 51, 100, 7], "203.0.113.1");
        req.headers_mut()
            .insert("X-Real-IP", HeaderValue::from_static("203.0.113.2"));
        assert_eq!(partition_key(&req, &trusted()).as_str(), "198.51.100.7");
    }

    #[test]
    fn test_trusted_proxy_forwards_the_client() {
        let req = forwarded(PROXY, "203.0.113.1");
        assert_eq!(partition_key(&req, &trusted()).as_str(), "203.0.113.1");

        let mut req = from_peer(PROXY);
        req.headers_mut()
            .insert("X-Real-IP", HeaderValue::from_static("203.0.113.2"));
        assert_eq!(partition_key(&req, &trusted()).as_str(), "203.0.113.2");
    }

    #[test]
    fn test_spoofed_leading_hop_is_skipped() {
        // Client sent "1.2.3.4"; the proxy appended the real address
        let req = forwarded(PROXY, "1.2.3.4, 203.0.113.1");
        assert_eq!(partition_key(&req, &trusted()).as_str(), "203.0.113.1");
    }

    #[test]
    fn test_malformed_forwarded_for_falls_back_to_peer() {
        let req = forwarded(PROXY, "not-an-ip");
        assert_eq!(partition_key(&req, &trusted()).as_str(), "10.0.0.2");
    }

    #[test]
    fn test_principal_takes_precedence_over_ip() {
        let mut req = from_peer([198, 51, 100, 1]);
        req.extensions_mut().insert(Principal::new("alice"));
        assert_eq!(partition_key(&req, &[]).as_str(), "alice");
    }

    #[test]
    fn test_unknown_origin_is_anonymous() {
        let req = forwarded_without_peer();
        assert_eq!(
            partition_key(&req, &trusted()).as_str(),
            tidy_core::rate_limit::ANONYMOUS_PARTITION
        );
    }

    fn forwarded_without_peer() -> Request {
        Request::builder()
            .uri("/")
            .header("X-Forwarded-For", "203.0.113.1")
            .body(Body::empty())
            .unwrap()
    }
}
