//! Configuration management for the todo application.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tidy_core::RateLimitPolicy;
use tidy_web::{PipelineConfig, RuntimeMode};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment name; `Development` selects development mode
    pub environment: String,
    /// Application server configuration
    pub server: ServerConfig,
    /// Request pipeline configuration
    pub pipeline: PipelineSettings,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// HTTP port
    pub port: u16,
}

/// Request pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// HTTPS port to redirect to; redirection is off when unset
    pub https_port: Option<u16>,
    /// Static asset directory
    pub static_root: PathBuf,
    /// Requests admitted per partition per window
    pub rate_limit_permits: u32,
    /// Window length in seconds
    pub rate_limit_window_secs: u64,
    /// Strict-Transport-Security max-age in seconds
    pub hsts_max_age_secs: u64,
    /// Reverse proxies allowed to name the client in forwarding headers
    pub trusted_proxies: Vec<IpAddr>,
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// `token=name[:Role|Role]` entries, comma-separated
    pub tokens: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tokens", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        Self {
            environment: lookup("APP_ENVIRONMENT").unwrap_or_else(|| "Production".to_string()),
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_with(&lookup, "SERVER_PORT").unwrap_or(8080),
            },
            pipeline: PipelineSettings {
                https_port: parse_with(&lookup, "HTTPS_PORT"),
                static_root: lookup("STATIC_ROOT")
                    .map_or_else(|| PathBuf::from("wwwroot"), PathBuf::from),
                rate_limit_permits: parse_with(&lookup, "RATE_LIMIT_PERMITS").unwrap_or(100),
                rate_limit_window_secs: parse_with(&lookup, "RATE_LIMIT_WINDOW_SECS").unwrap_or(60),
                hsts_max_age_secs: parse_with(&lookup, "HSTS_MAX_AGE_SECS").unwrap_or(2_592_000),
                trusted_proxies: lookup("TRUSTED_PROXIES")
                    .map(|list| {
                        list.split(',')
                            .filter_map(|entry| entry.trim().parse().ok())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            auth: AuthConfig {
                tokens: lookup("AUTH_TOKENS").unwrap_or_default(),
            },
            metrics_enabled: lookup("METRICS_ENABLED")
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True")),
        }
    }

    /// Runtime mode selected by [`Config::environment`].
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        RuntimeMode::from_environment_name(&self.environment)
    }

    /// Socket address string for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Settings for the request pipeline.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            mode: self.mode(),
            static_root: self.pipeline.static_root.clone(),
            https_port: self.pipeline.https_port,
            hsts_max_age: Duration::from_secs(self.pipeline.hsts_max_age_secs),
            rate_limit: RateLimitPolicy::new(
                self.pipeline.rate_limit_permits,
                Duration::from_secs(self.pipeline.rate_limit_window_secs.max(1)),
            ),
            trusted_proxies: self.pipeline.trusted_proxies.clone(),
        }
    }
}
