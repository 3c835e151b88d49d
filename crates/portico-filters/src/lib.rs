//! # Portico Filters
//!
//! The request/response filter pipeline of a Portico host.
//!
//! Filters come from three sources:
//!
//! - **Global filters**: registered once at startup, run in registration
//!   order for every exchange (optionally only for one DTO type)
//! - **Attribute filters**: declared on a DTO type with a priority; sorted
//!   once per type and cached for the process lifetime
//! - **Pre-request filters**: global only, run before routing
//!
//! ## Execution order
//!
//! ```text
//! attributes (priority < 0) ─▶ global ─▶ typed global ─▶ attributes (priority >= 0)
//! ```
//!
//! Every filter may close the response. The pipeline checks the closed flag
//! after each filter and stops the phase at once.
//!
//! ## Error dispatch
//!
//! | Step | Handler                                   |
//! |------|-------------------------------------------|
//! | 1    | override registered for the status code   |
//! | 2    | built-in 403 / 404 handler                |
//! | 3    | global HTML error handler                 |
//! | 4    | not-found handler (always present)        |
//!
//! ## Example
//!
//! ```
//! use portico_filters::{FilterPipeline, FilterRegistry, FnRequestFilter};
//!
//! struct CreateOrder;
//!
//! let pipeline = FilterPipeline::builder()
//!     .registry(
//!         FilterRegistry::builder()
//!             .request_filter(FnRequestFilter::new("audit", |_req, _res, _dto| Ok(())))
//!             .request_attribute::<CreateOrder>(-10, FnRequestFilter::new("auth", |_req, _res, _dto| Ok(())))
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(pipeline.registry().request_filters().len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/portico-filters/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod attribute;
pub mod cache;
pub mod exception;
pub mod filter;
pub mod gate;
pub mod handlers;
pub mod pipeline;
pub mod registry;
pub mod wiring;

pub use attribute::{FilterAttribute, RequestFilterAttribute, ResponseFilterAttribute};
pub use cache::AttributeFilterCache;
pub use exception::{on_exception_type_filter, ExceptionTranslator, ExceptionTypeFilter};
pub use filter::{
    BoxFuture, FnPreRequestFilter, FnRequestFilter, FnResponseFilter, PreRequestFilter,
    RequestFilter, ResponseFilter,
};
pub use gate::{FeatureGate, METADATA_NOT_AVAILABLE, METADATA_NOT_VISIBLE};
pub use handlers::{
    ErrorHandlerResolver, ErrorHandlerResolverBuilder, ErrorHttpHandler, ForbiddenHandler,
    NotFoundHandler,
};
pub use pipeline::{FilterPipeline, FilterPipelineBuilder};
pub use registry::{FilterRegistry, FilterRegistryBuilder};
pub use wiring::{ContainerWiring, FilterInfo, FilterWiring};
