//! # Portico
//!
//! **Priority-ordered request/response filters for web hosts**
//!
//! Portico runs the filters around a service call:
//!
//! - **Pre-request filters** before routing
//! - **Request filters** after the request DTO is bound, interleaving
//!   attribute filters (by priority) with global and per-type filters
//! - **Response filters** after the service produced its output
//! - **Error dispatch** to per-status, generic or not-found handlers
//! - **Feature gating** of formats, metadata pages and admin operations
//!
//! ## Quick Start
//!
//! ```rust
//! use portico::host::HostBuilder;
//! use portico::prelude::*;
//!
//! struct CreateOrder;
//!
//! let registry = FilterRegistry::builder()
//!     .request_attribute::<CreateOrder>(
//!         -10,
//!         FnRequestFilter::new("require-tenant", |req, res, _dto| {
//!             if req.header("x-tenant").is_none() {
//!                 res.end_with(StatusCode::BAD_REQUEST, "text/plain", "missing tenant")?;
//!             }
//!             Ok(())
//!         }),
//!     )
//!     .build();
//!
//! let pipeline = HostBuilder::new(HostConfig::default())
//!     .registry(registry)
//!     .build()
//!     .unwrap();
//!
//! let mut req = Request::new(Method::POST, "/orders".parse().unwrap());
//! let mut res = Response::new();
//! let closed = tokio_test::block_on(pipeline.run_request_filters(&mut req, &mut res, &CreateOrder))
//!     .unwrap();
//! assert!(closed);
//! ```
//!
//! ## Request phase order
//!
//! ```text
//! attributes (priority < 0) → global → typed global → attributes (priority >= 0)
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod host;

// Re-export exchange model and errors
pub use portico_core as core;

// Re-export the filter pipeline
pub use portico_filters as filters;

// Re-export configuration
pub use portico_config as config;

// Re-export observability
pub use portico_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use portico::prelude::*;
///
/// let gate = FeatureGate::new(Feature::JSON);
/// assert!(gate.assert_features(Feature::XML).is_err());
/// ```
pub mod prelude {
    pub use portico_core::{
        Container, Dto, Feature, HostError, HostResult, HttpResult, Request, RequestAttributes,
        RequestId, Response, ResponseError, ResponseStatus, ServiceOutput,
    };

    pub use portico_filters::{
        ErrorHandlerResolver, ErrorHttpHandler, FeatureGate, FilterPipeline, FilterRegistry,
        FnPreRequestFilter, FnRequestFilter, FnResponseFilter, PreRequestFilter, RequestFilter,
        ResponseFilter,
    };

    pub use portico_config::{ConfigLoader, FeaturesConfig, HostConfig, HostSection, LoggingConfig};

    pub use crate::host::{HostBuilder, StartupError};

    pub use http::{Method, StatusCode};
}
