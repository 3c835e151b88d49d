//! Root configuration type.
//!
//! This module provides [`HostConfig`] and its builder.

use portico_core::{Feature, RequestAttributes};
use portico_telemetry::{logging::create_env_filter, LogFormat};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, FeaturesConfig, HostSection, LoggingConfig};

/// Complete Portico host configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use portico_config::HostConfig;
///
/// let config = HostConfig::default();
/// assert_eq!(config.features.enabled, ["all"]);
/// assert!(!config.host.debug_mode);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Enabled features and metadata visibility.
    #[serde(default)]
    pub features: FeaturesConfig,

    /// Host behaviour.
    #[serde(default)]
    pub host: HostSection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HostConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::{HostConfig, HostSection};
    ///
    /// let config = HostConfig::builder()
    ///     .host(HostSection {
    ///         debug_mode: true,
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert!(config.host.debug_mode);
    /// ```
    #[must_use]
    pub fn builder() -> HostConfigBuilder {
        HostConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - A feature or visibility name is unknown
    /// - The visibility list is empty
    /// - The admin secret is set but empty
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features.enabled_features()?;
        self.features.metadata_visibility_mask()?;

        if self.features.metadata_visibility.is_empty() {
            return Err(ConfigError::invalid_value(
                "features.metadata_visibility",
                "must not be empty, use [\"any\"] for no restriction",
            ));
        }

        if self
            .host
            .admin_auth_secret
            .as_deref()
            .is_some_and(|secret| secret.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "host.admin_auth_secret",
                "must not be empty, omit it to lock admin operations",
            ));
        }

        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// The enabled feature set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFlag`] for an unrecognised name.
    pub fn enabled_features(&self) -> Result<Feature, ConfigError> {
        self.features.enabled_features()
    }

    /// The metadata visibility mask.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFlag`] for an unrecognised name.
    pub fn metadata_visibility(&self) -> Result<RequestAttributes, ConfigError> {
        self.features.metadata_visibility_mask()
    }

    /// Development preset: debug mode, pretty logs with filter tracing.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::HostConfig;
    ///
    /// let config = HostConfig::development();
    /// assert!(config.host.debug_mode);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.host.debug_mode = true;
        config.logging.level = "debug,portico_filters=trace".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Production preset: JSON logs at `info`, metadata limited to the
    /// internal network.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.features.metadata_visibility = vec!["internal_network_access".to_string()];
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

/// Builder for [`HostConfig`].
#[derive(Debug, Default)]
pub struct HostConfigBuilder {
    features: Option<FeaturesConfig>,
    host: Option<HostSection>,
    logging: Option<LoggingConfig>,
}

impl HostConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the features section.
    #[must_use]
    pub fn features(mut self, features: FeaturesConfig) -> Self {
        self.features = Some(features);
        self
    }

    /// Set the host section.
    #[must_use]
    pub fn host(mut self, host: HostSection) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> HostConfig {
        HostConfig {
            features: self.features.unwrap_or_default(),
            host: self.host.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HostConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
