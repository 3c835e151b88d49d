//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to install the metrics recorder.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to install the log subscriber.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The log level or filter directive is not valid.
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("recorder already installed".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to initialize metrics: recorder already installed"
        );

        let err = TelemetryError::InvalidFilter {
            filter: "portico=loud".to_string(),
            reason: "bad level".to_string(),
        };
        assert!(err.to_string().contains("portico=loud"));
    }
}
