//! Telemetry configuration.

use crate::logging::{LogConfig, LogFormat};
use crate::metrics::MetricsConfig;

/// Configuration for logging and metrics together.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Sets the log output format.
    #[must_use]
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Disables the log subscriber.
    #[must_use]
    pub fn disable_logging(mut self) -> Self {
        self.config.logging.enabled = false;
        self
    }

    /// Disables the metrics recorder.
    #[must_use]
    pub fn disable_metrics(mut self) -> Self {
        self.config.metrics.enabled = false;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}
