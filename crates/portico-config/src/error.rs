//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading host configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A flag list names a flag that does not exist.
    #[error("unknown flag '{name}' in {field}")]
    UnknownFlag {
        /// The list the name appeared in.
        field: String,
        /// The unrecognised name.
        name: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// Unsupported file format or other structural problem.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new unknown flag error.
    pub fn unknown_flag(field: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownFlag {
            field: field.into(),
            name: name.into(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Create a new validation error.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/etc/portico/host.toml");
        assert!(err.to_string().contains("/etc/portico/host.toml"));
    }

    #[test]
    fn test_unknown_flag_error() {
        let err = ConfigError::unknown_flag("features.enabled", "telepathy");
        assert_eq!(
            err.to_string(),
            "unknown flag 'telepathy' in features.enabled"
        );
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("host.admin_auth_secret", "must not be empty");
        assert!(err.to_string().contains("host.admin_auth_secret"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("PORTICO__HOST__DEBUG_MODE", "expected boolean");
        assert!(err.to_string().contains("PORTICO__HOST__DEBUG_MODE"));
        assert!(err.to_string().contains("expected boolean"));
    }
}
