//! Prometheus metrics for the request-processing core.
//!
//! This module provides metric collection for:
//! - Rate limiter admissions and rejections
//! - Notification dispatch and handler failures
//! - Faults caught by the pipeline's exception boundary
//!
//! # Example
//!
//! ```rust,no_run
//! use tidy_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // Rendered text is what `/metrics` serves
//! let text = recorder.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder handle.
///
/// Installs the global recorder once and renders the exposition text on
/// demand, so the application can serve it from its own router.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create an uninstalled recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves the handle empty.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder hasn't been installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Rate Limiter Metrics
    describe_counter!(
        "rate_limiter_admitted_total",
        "Total number of requests admitted by the rate limiter"
    );
    describe_counter!(
        "rate_limiter_rejected_total",
        "Total number of requests rejected with 429"
    );

    // Dispatcher Metrics
    describe_counter!(
        "dispatcher_events_published_total",
        "Total number of domain events published"
    );
    describe_counter!(
        "dispatcher_handler_failures_total",
        "Total number of notification handler failures"
    );

    // Pipeline Metrics
    describe_counter!(
        "pipeline_faults_total",
        "Total number of requests normalized by the exception boundary"
    );
}

/// Rate limiter metrics recorder.
pub struct RateLimiterMetrics;

impl RateLimiterMetrics {
    /// Record an admitted request.
    pub fn record_admitted() {
        counter!("rate_limiter_admitted_total").increment(1);
    }

    /// Record a rejected request.
    pub fn record_rejected() {
        counter!("rate_limiter_rejected_total").increment(1);
    }
}

/// Notification dispatcher metrics recorder.
pub struct DispatcherMetrics;

impl DispatcherMetrics {
    /// Record a published event.
    pub fn record_publish(event: &'static str) {
        counter!("dispatcher_events_published_total", "event" => event).increment(1);
    }

    /// Record a handler failure.
    pub fn record_failure(event: &'static str) {
        counter!("dispatcher_handler_failures_total", "event" => event).increment(1);
    }
}

/// Exception boundary metrics recorder.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record a fault converted into a generic error response.
    pub fn record_fault(kind: &'static str) {
        counter!("pipeline_faults_total", "kind" => kind).increment(1);
    }
}
