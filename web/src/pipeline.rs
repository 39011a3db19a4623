//! Request pipeline composition.
//!
//! [`Pipeline::wrap`] puts the application's routes behind the fixed stage
//! order, outermost first:
//!
//! ```text
//! 1. exception boundary        ExceptionBoundaryLayer
//! 2. runtime-mode branch       development: request logging
//!                              production:  HSTS header, rate limiter
//! 3. HTTPS redirection         redirect_to_https
//! 4. response compression      CompressionLayer
//! 5. static assets             ServeDir (short-circuits on a file match)
//! 6. authentication            authenticate
//! 7. authorization             authorize
//! 8. routing                   application routes, index.html fallback
//! ```
//!
//! In production the HSTS header is stamped on every response, including
//! the boundary's generic 500, so that layer wraps the boundary itself.
//!
//! Axum applies the last `.layer` call outermost, so the code below builds
//! the chain from the inside out.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = Pipeline::builder(config)
//!     .identity(Arc::new(resolver))
//!     .authorization(policy)
//!     .build();
//!
//! let app = pipeline.wrap(routes);
//! axum::serve(listener, app).await?;
//! ```

use crate::config::{PipelineConfig, RuntimeMode};
use crate::middleware::{
    AuthorizationPolicy, ExceptionBoundaryLayer, HttpsRedirect, RateLimitLayer, authenticate,
    authorize, log_requests, redirect_to_https,
};
use axum::{
    Router,
    http::{HeaderValue, header::STRICT_TRANSPORT_SECURITY},
    middleware::{from_fn, from_fn_with_state},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use tidy_core::{
    Clock, Credentials, IdentityError, IdentityResolver, Principal, SystemClock,
};
use tidy_runtime::FixedWindowRateLimiter;
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
};

/// Document served when no route matches.
pub const FALLBACK_DOCUMENT: &str = "index.html";

/// Identity resolver that recognises nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn resolve<'a>(
        &'a self,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Option<Principal>, IdentityError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    identity: Arc<dyn IdentityResolver>,
    authorization: AuthorizationPolicy,
    clock: Arc<dyn Clock>,
}

impl PipelineBuilder {
    /// Resolver used by the authentication stage.
    #[must_use]
    pub fn identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    /// Rules enforced by the authorization stage.
    #[must_use]
    pub fn authorization(mut self, policy: AuthorizationPolicy) -> Self {
        self.authorization = policy;
        self
    }

    /// Clock driving the rate limiter's windows.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the pipeline.
    ///
    /// The rate limiter only exists in production mode.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let limiter = match self.config.mode {
            RuntimeMode::Development => None,
            RuntimeMode::Production => Some(Arc::new(FixedWindowRateLimiter::new(
                self.config.rate_limit,
                self.clock,
            ))),
        };

        let hsts = HeaderValue::try_from(format!("max-age={}", self.config.hsts_max_age.as_secs()))
            .ok();

        if self.config.https_port.is_none() {
            tracing::warn!("No HTTPS port configured; HTTPS redirection is disabled");
        }

        tracing::info!(
            mode = ?self.config.mode,
            static_root = %self.config.static_root.display(),
            https_port = ?self.config.https_port,
            "Request pipeline built"
        );

        Pipeline {
            config: self.config,
            identity: self.identity,
            authorization: Arc::new(self.authorization),
            limiter,
            hsts,
        }
    }
}

/// The composed request pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    identity: Arc<dyn IdentityResolver>,
    authorization: Arc<AuthorizationPolicy>,
    limiter: Option<Arc<FixedWindowRateLimiter>>,
    hsts: Option<HeaderValue>,
}

impl Pipeline {
    /// Start building a pipeline.
    ///
    /// Defaults: no identity resolver (everyone anonymous), an empty
    /// authorization policy and the system clock.
    #[must_use]
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            identity: Arc::new(NoIdentity),
            authorization: AuthorizationPolicy::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The shared rate limiter; `None` in development mode.
    #[must_use]
    pub const fn rate_limiter(&self) -> Option<&Arc<FixedWindowRateLimiter>> {
        self.limiter.as_ref()
    }

    /// Put `routes` behind every pipeline stage.
    #[must_use]
    pub fn wrap(&self, routes: Router) -> Router {
        let static_root = &self.config.static_root;

        // 8. routing, 7. authorization, 6. authentication
        let secured = routes
            .fallback_service(ServeFile::new(static_root.join(FALLBACK_DOCUMENT)))
            .layer(from_fn_with_state(Arc::clone(&self.authorization), authorize))
            .layer(from_fn_with_state(Arc::clone(&self.identity), authenticate));

        // 5. static assets
        let assets = ServeDir::new(static_root)
            .append_index_html_on_directories(false)
            .call_fallback_on_method_not_allowed(true)
            .fallback(secured);

        // 4. compression, 3. HTTPS redirection
        let app = Router::new()
            .fallback_service(assets)
            .layer(CompressionLayer::new())
            .layer(from_fn_with_state(
                HttpsRedirect::new(self.config.https_port),
                redirect_to_https,
            ));

        // 2. runtime-mode branch
        let app = match self.config.mode {
            RuntimeMode::Development => app.layer(from_fn(log_requests)),
            RuntimeMode::Production => match &self.limiter {
                Some(limiter) => app.layer(
                    RateLimitLayer::new(Arc::clone(limiter))
                        .trusted_proxies(self.config.trusted_proxies.iter().copied()),
                ),
                None => app,
            },
        };

        // 1. exception boundary
        let app = app.layer(ExceptionBoundaryLayer::new());

        // HSTS sits outside the boundary so normalized 500s carry it too
        match (&self.hsts, self.config.mode) {
            (Some(hsts), RuntimeMode::Production) => app.layer(
                SetResponseHeaderLayer::if_not_present(STRICT_TRANSPORT_SECURITY, hsts.clone()),
            ),
            _ => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_has_no_limiter() {
        let config = PipelineConfig {
            mode: RuntimeMode::Development,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder(config).build().rate_limiter().is_none());
    }

    #[test]
    fn test_production_limiter_uses_policy() {
        let pipeline = Pipeline::builder(PipelineConfig::default()).build();
        let limiter = pipeline.rate_limiter().map(|l| l.policy().permit_limit);
        assert_eq!(limiter, Some(100));
    }

    #[test]
    fn test_hsts_value() {
        let pipeline = Pipeline::builder(PipelineConfig::default()).build();
        assert_eq!(
            pipeline.hsts.as_ref().and_then(|v| v.to_str().ok()),
            Some("max-age=2592000")
        );
    }
}
