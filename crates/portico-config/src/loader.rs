//! Layered configuration loading.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! defaults, files, strings, and environment variables.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use portico_telemetry::LogFormat;

use crate::{ConfigError, HostConfig};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use portico_config::ConfigLoader;
///
/// # fn main() -> Result<(), portico_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("portico.toml")?
///     .with_env_prefix("PORTICO")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: HostConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new loader starting from default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HostConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert!(config.host.debug_mode);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HostConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HostConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension (`.toml` or `.json`). The file
    /// replaces the current configuration; sections it omits take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`"toml"` or
    /// `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [features]
    ///     enabled = ["json", "metadata"]
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.features.enabled, ["json", "metadata"]);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// Variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `PORTICO__FEATURES__ENABLED=json,metadata`. List values are
    /// comma-separated.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<HostConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HostConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<HostConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        // Sorted so a bad variable is reported deterministically.
        let env_vars: BTreeMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(key_without_prefix) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            // Shares the prefix but not the separator, e.g. PORTICO_HOME.
            return Ok(());
        };

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["FEATURES", "ENABLED"] => {
                self.config.features.enabled = parse_list(value);
            }
            ["FEATURES", "METADATA_VISIBILITY"] => {
                self.config.features.metadata_visibility = parse_list(value);
            }

            ["HOST", "DEBUG_MODE"] => {
                self.config.host.debug_mode = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["HOST", "ADMIN_AUTH_SECRET"] => {
                self.config.host.admin_auth_secret = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json' or 'pretty'"))?;
            }

            _ => {}
        }

        Ok(())
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::Feature;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert!(config.host.debug_mode);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"host": {"debug_mode": true}, "logging": {"format": "pretty"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.host.debug_mode);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.features.enabled, ["all"]);
    }

    #[test]
    fn test_loader_with_string_unknown_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_field() {
        let result = ConfigLoader::new().with_string("[features]\nturbo = true\n", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_validates_on_load() {
        let result = ConfigLoader::new()
            .with_string("[features]\nenabled = [\"json\", \"smoke_signals\"]\n", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::UnknownFlag { .. })));
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[host]\nadmin_auth_secret = \"from-file\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.host.admin_auth_secret.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_loader_with_file_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/portico.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/portico.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_apply_env_var_features() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__FEATURES__ENABLED", "json, metadata,", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__FEATURES__METADATA_VISIBILITY", "localhost", "TEST")
            .unwrap();

        assert_eq!(loader.config.features.enabled, ["json", "metadata"]);
        assert_eq!(
            loader.config.enabled_features().unwrap(),
            Feature::JSON | Feature::METADATA
        );
        assert_eq!(loader.config.features.metadata_visibility, ["localhost"]);
    }

    #[test]
    fn test_apply_env_var_host() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__HOST__DEBUG_MODE", "yes", "TEST").unwrap();
        loader
            .apply_env_var("TEST__HOST__ADMIN_AUTH_SECRET", "s3cret", "TEST")
            .unwrap();
        assert!(loader.config.host.debug_mode);
        assert_eq!(loader.config.host.admin_auth_secret.as_deref(), Some("s3cret"));

        loader.apply_env_var("TEST__HOST__ADMIN_AUTH_SECRET", "", "TEST").unwrap();
        assert!(loader.config.host.admin_auth_secret.is_none());
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__LEVEL", "debug", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "PRETTY", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__ENABLED", "off", "TEST").unwrap();

        assert_eq!(loader.config.logging.level, "debug");
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(!loader.config.logging.enabled);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(matches!(
            loader.apply_env_var("TEST__HOST__DEBUG_MODE", "sometimes", "TEST"),
            Err(ConfigError::EnvParseError { .. })
        ));
        assert!(matches!(
            loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST"),
            Err(ConfigError::EnvParseError { .. })
        ));
    }

    #[test]
    fn test_apply_env_var_ignores_unrelated_keys() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST_HOME", "/opt", "TEST").unwrap();
        loader.apply_env_var("TEST__HOST__COLOUR", "blue", "TEST").unwrap();
        assert_eq!(loader.config, HostConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
