//! Assembling a pipeline from host configuration.

use http::StatusCode;
use portico_config::{ConfigError, HostConfig};
use portico_core::{HostError, ResponseStatus};
use portico_filters::{
    ErrorHandlerResolver, ErrorHandlerResolverBuilder, ErrorHttpHandler, ExceptionTranslator,
    ExceptionTypeFilter, FeatureGate, FilterPipeline, FilterPipelineBuilder, FilterRegistry,
    FilterWiring,
};
use portico_telemetry::{MetricsConfig, TelemetryConfig, TelemetryError};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while bringing a host up.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Builds a [`FilterPipeline`] whose feature gate, error handlers and
/// exception translator follow a [`HostConfig`].
///
/// # Example
///
/// ```
/// use portico::host::HostBuilder;
/// use portico::prelude::*;
///
/// let config = HostConfig::builder()
///     .features(FeaturesConfig {
///         enabled: vec!["json".into()],
///         ..Default::default()
///     })
///     .build();
///
/// let pipeline = HostBuilder::new(config).build().unwrap();
/// assert!(!pipeline.feature_gate().has_feature(Feature::METADATA));
/// ```
pub struct HostBuilder {
    config: HostConfig,
    pipeline: FilterPipelineBuilder,
    errors: ErrorHandlerResolverBuilder,
    exception_filters: Vec<ExceptionTypeFilter>,
}

impl HostBuilder {
    /// Starts from `config` with no filters registered.
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            pipeline: FilterPipeline::builder(),
            errors: ErrorHandlerResolver::builder(),
            exception_filters: Vec::new(),
        }
    }

    /// Sets the filter registrations.
    #[must_use]
    pub fn registry(mut self, registry: FilterRegistry) -> Self {
        self.pipeline = self.pipeline.registry(registry);
        self
    }

    /// Registers an error handler for one status code.
    #[must_use]
    pub fn custom_error_handler(
        mut self,
        status: StatusCode,
        handler: impl ErrorHttpHandler,
    ) -> Self {
        self.errors = self.errors.custom_handler(status, handler);
        self
    }

    /// Sets the generic error handler.
    #[must_use]
    pub fn global_html_error_handler(mut self, handler: impl ErrorHttpHandler) -> Self {
        self.errors = self.errors.global_html_error_handler(handler);
        self
    }

    /// Appends an exception enrichment step.
    #[must_use]
    pub fn exception_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&HostError, &mut ResponseStatus) + Send + Sync + 'static,
    {
        self.exception_filters.push(Arc::new(filter));
        self
    }

    /// Replaces the default wiring hooks.
    #[must_use]
    pub fn wiring(mut self, wiring: impl FilterWiring) -> Self {
        self.pipeline = self.pipeline.wiring(wiring);
        self
    }

    /// Validates the configuration and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn build(self) -> Result<FilterPipeline, ConfigError> {
        self.config.validate()?;

        let debug_mode = self.config.host.debug_mode;
        let exceptions = self
            .exception_filters
            .into_iter()
            .fold(ExceptionTranslator::new(debug_mode), |translator, filter| {
                translator.with_filter(move |error, status| filter(error, status))
            });

        let gate = feature_gate(&self.config)?;
        tracing::debug!(
            debug_mode,
            features = %gate.enabled(),
            visibility = %gate.metadata_visibility(),
            "filter pipeline assembled"
        );

        Ok(self
            .pipeline
            .feature_gate(gate)
            .error_handlers(self.errors.debug_mode(debug_mode).build())
            .exceptions(exceptions)
            .build())
    }
}

/// Builds the feature gate described by `config`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownFlag`] for an unrecognised flag name.
pub fn feature_gate(config: &HostConfig) -> Result<FeatureGate, ConfigError> {
    let gate = FeatureGate::new(config.enabled_features()?)
        .with_metadata_visibility(config.metadata_visibility()?);

    Ok(match config.host.admin_auth_secret.as_deref() {
        Some(secret) => gate.with_admin_auth_secret(secret),
        None => gate,
    })
}

/// Installs logging per `config.logging` and the Prometheus recorder.
///
/// # Errors
///
/// Returns [`TelemetryError`] if a subscriber or recorder is already
/// installed or the log filter is invalid.
pub fn init_telemetry(config: &HostConfig) -> Result<(), TelemetryError> {
    portico_telemetry::init_telemetry(&telemetry_config(config))
}

fn telemetry_config(config: &HostConfig) -> TelemetryConfig {
    TelemetryConfig {
        logging: config.logging.to_log_config(),
        metrics: MetricsConfig::default(),
    }
}

/// Validates `config`, builds a pipeline with `registry`, then installs
/// telemetry.
///
/// # Errors
///
/// Returns [`StartupError`] if any step fails.
pub fn start(config: HostConfig, registry: FilterRegistry) -> Result<FilterPipeline, StartupError> {
    let telemetry = telemetry_config(&config);
    let pipeline = HostBuilder::new(config).registry(registry).build()?;
    portico_telemetry::init_telemetry(&telemetry)?;
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use portico_config::{FeaturesConfig, HostSection};
    use portico_core::{Feature, Request, RequestAttributes, Response};
    use portico_filters::FilterInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_feature_gate_follows_config() {
        let config = HostConfig::builder()
            .features(FeaturesConfig {
                enabled: vec!["json".into(), "metadata".into()],
                metadata_visibility: vec!["localhost".into()],
            })
            .host(HostSection {
                admin_auth_secret: Some("s3cret".into()),
                ..Default::default()
            })
            .build();

        let gate = feature_gate(&config).unwrap();
        assert_eq!(gate.enabled(), Feature::JSON | Feature::METADATA);
        assert_eq!(gate.metadata_visibility(), RequestAttributes::LOCALHOST);

        let req = Request::new(Method::GET, "/admin?authsecret=s3cret".parse().unwrap());
        assert!(gate.has_valid_auth_secret(&req));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = HostConfig::builder()
            .features(FeaturesConfig {
                enabled: vec!["json".into(), "teleport".into()],
                ..Default::default()
            })
            .build();

        assert!(matches!(
            HostBuilder::new(config).build(),
            Err(ConfigError::UnknownFlag { .. })
        ));
    }

    #[tokio::test]
    async fn test_debug_mode_reaches_not_found_handler() {
        let pipeline = HostBuilder::new(HostConfig::development()).build().unwrap();

        let mut req = Request::new(Method::GET, "/missing".parse().unwrap());
        let mut res = Response::new();
        pipeline
            .handle_error_response(&mut req, &mut res, StatusCode::NOT_FOUND, None)
            .await
            .unwrap();

        let body = String::from_utf8_lossy(res.body());
        assert!(body.contains("Request.PathInfo: /missing"));
    }

    #[test]
    fn test_start_rejects_invalid_config_before_telemetry() {
        let config = HostConfig::builder()
            .logging(portico_config::LoggingConfig {
                level: "portico=loud".into(),
                ..Default::default()
            })
            .build();

        assert!(matches!(
            start(config, FilterRegistry::empty()),
            Err(StartupError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_exception_filters_and_debug_mode() {
        let pipeline = HostBuilder::new(HostConfig::development())
            .exception_filter(|_error, status| status.message.push_str(" (see logs)"))
            .build()
            .unwrap();

        let status = pipeline.to_response_status(&HostError::internal("boom"));
        assert_eq!(status.message, "boom (see logs)");
        assert!(status.stack_trace.is_some());
    }

    #[tokio::test]
    async fn test_custom_wiring_is_used() {
        struct Counting(Arc<AtomicUsize>);

        impl FilterWiring for Counting {
            fn auto_wire(&self, _info: &FilterInfo, _req: &Request) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }

            fn release(&self, _info: &FilterInfo) {}
        }

        struct Order;

        let wired = Arc::new(AtomicUsize::new(0));
        let pipeline = HostBuilder::new(HostConfig::default())
            .registry(
                FilterRegistry::builder()
                    .request_attribute::<Order>(
                        1,
                        portico_filters::FnRequestFilter::new("noop", |_req, _res, _dto| Ok(())),
                    )
                    .build(),
            )
            .wiring(Counting(Arc::clone(&wired)))
            .build()
            .unwrap();

        let mut req = Request::new(Method::POST, "/orders".parse().unwrap());
        let mut res = Response::new();
        pipeline
            .run_request_filters(&mut req, &mut res, &Order)
            .await
            .unwrap();

        assert_eq!(wired.load(Ordering::SeqCst), 1);
    }
}
