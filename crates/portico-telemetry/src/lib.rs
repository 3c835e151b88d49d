//! Observability for Portico hosts.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: counters and histograms for the filter pipeline through
//!   the `metrics` facade, rendered in Prometheus format
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `portico_filters_executed_total` | Counter | `phase`, `tier` | Filters invoked |
//! | `portico_short_circuits_total` | Counter | `phase`, `filter` | Responses closed early |
//! | `portico_filter_phase_duration_seconds` | Histogram | `phase` | Phase latency |
//! | `portico_error_responses_total` | Counter | `status` | Error dispatches |
//! | `portico_feature_denials_total` | Counter | `reason` | Feature gate denials |
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, MetricsConfig, PhaseTimer};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem's error.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
