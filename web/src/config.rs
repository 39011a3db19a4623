//! Pipeline configuration.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tidy_core::RateLimitPolicy;

/// HSTS max-age used when none is configured (30 days).
pub const DEFAULT_HSTS_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Runtime mode, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    /// Request logging; no rate limiting or HSTS.
    Development,
    /// HSTS and rate limiting.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Parse an environment name.
    ///
    /// Only `Development` (case-insensitive) selects development mode;
    /// every other name runs in production.
    #[must_use]
    pub fn from_environment_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Whether this is development mode.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Settings for [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Runtime mode.
    pub mode: RuntimeMode,
    /// Directory static assets are served from.
    pub static_root: PathBuf,
    /// HTTPS port to redirect to. Redirection is disabled when unset.
    pub https_port: Option<u16>,
    /// `max-age` of the Strict-Transport-Security header.
    pub hsts_max_age: Duration,
    /// Fixed-window policy applied in production.
    pub rate_limit: RateLimitPolicy,
    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` are believed.
    /// Empty: the rate limiter keys on the TCP peer only.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::default(),
            static_root: PathBuf::from("wwwroot"),
            https_port: None,
            hsts_max_age: DEFAULT_HSTS_MAX_AGE,
            rate_limit: RateLimitPolicy::default(),
            trusted_proxies: Vec::new(),
        }
    }
}
