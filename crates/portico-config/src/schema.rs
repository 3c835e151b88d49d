//! Configuration schema types.
//!
//! This module defines the structure of each configuration section and the
//! conversions into the types the pipeline consumes.

use portico_core::{Feature, RequestAttributes};
use portico_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use crate::ConfigError;

/// Feature switches and metadata visibility.
///
/// Both fields are lists of flag names, matched case-insensitively.
///
/// # Example
///
/// ```
/// use portico_config::FeaturesConfig;
/// use portico_core::Feature;
///
/// let features = FeaturesConfig {
///     enabled: vec!["json".into(), "metadata".into()],
///     ..Default::default()
/// };
/// assert_eq!(features.enabled_features().unwrap(), Feature::JSON | Feature::METADATA);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeaturesConfig {
    /// Enabled feature names. `["all"]` enables everything.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    /// Request attributes a caller must have to see metadata pages.
    /// `["any"]` imposes no restriction.
    #[serde(default = "default_metadata_visibility")]
    pub metadata_visibility: Vec<String>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            metadata_visibility: default_metadata_visibility(),
        }
    }
}

impl FeaturesConfig {
    /// Resolves `enabled` into a [`Feature`] set.
    ///
    /// An empty list disables every feature.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFlag`] for an unrecognised name.
    pub fn enabled_features(&self) -> Result<Feature, ConfigError> {
        parse_flags("features.enabled", &self.enabled, Feature::NONE, Feature::from_name)
    }

    /// Resolves `metadata_visibility` into a [`RequestAttributes`] mask.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFlag`] for an unrecognised name.
    pub fn metadata_visibility_mask(&self) -> Result<RequestAttributes, ConfigError> {
        parse_flags(
            "features.metadata_visibility",
            &self.metadata_visibility,
            RequestAttributes::NONE,
            RequestAttributes::from_name,
        )
    }
}

fn default_enabled() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_metadata_visibility() -> Vec<String> {
    vec!["any".to_string()]
}

fn parse_flags<T>(
    field: &str,
    names: &[String],
    empty: T,
    lookup: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError>
where
    T: BitOr<Output = T> + Copy,
{
    names.iter().try_fold(empty, |acc, name| {
        lookup(name.as_str())
            .map(|flag| acc | flag)
            .ok_or_else(|| ConfigError::unknown_flag(field, name.as_str()))
    })
}

/// Host behaviour switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    /// Adds diagnostics to error responses (stack traces, request details
    /// on 404 pages).
    #[serde(default)]
    pub debug_mode: bool,

    /// Secret that unlocks admin-only operations. `None` locks them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_auth_secret: Option<String>,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"portico_filters=trace,info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts into the telemetry crate's [`LogConfig`].
    ///
    /// Pretty output also turns on span events and source locations.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let pretty = self.format == LogFormat::Pretty;
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: pretty,
            file_line_info: pretty,
            ..LogConfig::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
