//! Filter pipeline metrics.
//!
//! Recorded through the `metrics` facade, so every function here is a no-op
//! until a recorder is installed (e.g. with [`init_metrics`]).
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `portico_filters_executed_total` | Counter | `phase`, `tier` |
//! | `portico_short_circuits_total` | Counter | `phase`, `filter` |
//! | `portico_filter_phase_duration_seconds` | Histogram | `phase` |
//! | `portico_error_responses_total` | Counter | `status` |
//! | `portico_feature_denials_total` | Counter | `reason` |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Installs a Prometheus recorder. The host exposes [`render_metrics`]
/// on whatever endpoint it likes.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus text format, or `None` before
/// [`init_metrics`].
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "portico_filters_executed_total",
        "Filters invoked, by phase and tier"
    );
    describe_counter!(
        "portico_short_circuits_total",
        "Exchanges closed by a filter before the phase completed"
    );
    describe_histogram!(
        "portico_filter_phase_duration_seconds",
        "Wall time of one filter phase"
    );
    describe_counter!(
        "portico_error_responses_total",
        "Error responses dispatched to an error handler"
    );
    describe_counter!(
        "portico_feature_denials_total",
        "Requests rejected by the feature gate"
    );
}

/// Records one filter invocation.
pub fn record_filter_executed(phase: &'static str, tier: &'static str) {
    counter!(
        "portico_filters_executed_total",
        "phase" => phase,
        "tier" => tier
    )
    .increment(1);
}

/// Records a filter closing the response.
pub fn record_short_circuit(phase: &'static str, filter: &'static str) {
    counter!(
        "portico_short_circuits_total",
        "phase" => phase,
        "filter" => filter
    )
    .increment(1);
}

/// Records an error response dispatch.
pub fn record_error_response(status: u16) {
    counter!("portico_error_responses_total", "status" => status.to_string()).increment(1);
}

/// Records a feature gate denial.
pub fn record_feature_denial(reason: &'static str) {
    counter!("portico_feature_denials_total", "reason" => reason).increment(1);
}

/// Records a phase's duration when dropped.
#[derive(Debug)]
pub struct PhaseTimer {
    phase: &'static str,
    started: Instant,
}

impl PhaseTimer {
    /// Starts timing a phase.
    #[must_use]
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            started: Instant::now(),
        }
    }

    /// Time since the phase started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        histogram!(
            "portico_filter_phase_duration_seconds",
            "phase" => self.phase
        )
        .record(self.elapsed().as_secs_f64());
    }
}
