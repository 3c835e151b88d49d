//! Typed configuration for Portico hosts.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields and unknown flag names)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use portico_config::ConfigLoader;
//!
//! # fn main() -> Result<(), portico_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("portico.toml")?
//!     .with_env_prefix("PORTICO")
//!     .load()?;
//!
//! println!("features: {}", config.enabled_features()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [features]
//! enabled = ["json", "xml", "metadata"]
//! metadata_visibility = ["localhost"]
//!
//! [host]
//! debug_mode = false
//! admin_auth_secret = "change-me"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `PORTICO__FEATURES__ENABLED=json,metadata`
//! - `PORTICO__HOST__DEBUG_MODE=true`
//! - `PORTICO__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HostConfig, HostConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{FeaturesConfig, HostSection, LoggingConfig};
