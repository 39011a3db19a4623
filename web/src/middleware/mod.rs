//! Pipeline stages.
//!
//! Stages that need to wrap the whole inner service are tower
//! [`Layer`](tower::Layer)s; the rest are `axum::middleware::from_fn`
//! functions.

pub mod authentication;
pub mod authorization;
pub mod exception;
pub mod https;
pub mod logging;
pub mod rate_limit;

pub use authentication::authenticate;
pub use authorization::{AccessRule, AuthorizationPolicy, Decision, authorize};
pub use exception::{ExceptionBoundary, ExceptionBoundaryLayer};
pub use https::{HttpsRedirect, redirect_to_https};
pub use logging::log_requests;
pub use rate_limit::{RateLimit, RateLimitLayer};
