//! Structured logging for Portico hosts.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! JSON or pretty output. The pipeline's phase spans ("Executing Request
//! Filters", ...) show up as span fields on every event emitted inside them.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation = "GetUser", "request accepted");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(TelemetryError::LoggingInit(format!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `"info"`, `"portico_filters=trace,info"`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to log span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output with filter-level tracing, for local runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug,portico_filters=trace".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Installs the global log subscriber.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad level directive and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
    }

    Ok(())
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive does not parse.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Field names used by the pipeline's log events.
pub mod fields {
    /// Request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// Operation the request was routed to.
    pub const OPERATION: &str = "operation";

    /// Filter phase (`pre_request`, `request`, `response`).
    pub const PHASE: &str = "phase";

    /// Filter name.
    pub const FILTER: &str = "filter";

    /// HTTP status code.
    pub const HTTP_STATUS: &str = "http.status_code";
}
