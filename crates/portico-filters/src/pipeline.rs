//! The filter pipeline.
//!
//! [`FilterPipeline`] runs the three filter phases of an exchange:
//!
//! ```text
//! transport ─▶ pre-request ─▶ (routing) ─▶ request ─▶ (service) ─▶ response ─▶ (serialization)
//! ```
//!
//! The request and response phases walk three sources in a fixed order:
//!
//! 1. attributes declared on the DTO type with priority `< 0`, ascending
//! 2. global filters in registration order, then typed global filters for
//!    the DTO type
//! 3. attributes with priority `>= 0`, ascending
//!
//! The response's closed flag is checked after every filter. Once it is
//! set nothing else in the phase runs, and a later phase called on the same
//! response returns `true` without running anything. A filter error is
//! returned to the caller as is.

use crate::attribute::{global_partition, RequestFilterAttribute, ResponseFilterAttribute};
use crate::exception::ExceptionTranslator;
use crate::gate::FeatureGate;
use crate::handlers::ErrorHandlerResolver;
use crate::registry::{BoxedResponseFilter, FilterRegistry};
use crate::wiring::{ContainerWiring, FilterInfo, FilterWiring, WiringGuard};
use http::StatusCode;
use portico_core::{Dto, HostError, HostResult, Request, Response, ResponseStatus, ServiceOutput};
use portico_telemetry::metrics::{
    record_error_response, record_filter_executed, record_short_circuit, PhaseTimer,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, trace, Instrument};

const PRE_REQUEST: &str = "pre_request";
const REQUEST: &str = "request";
const RESPONSE: &str = "response";

const TIER_ATTRIBUTE: &str = "attribute";
const TIER_GLOBAL: &str = "global";

/// Orchestrates filters, error dispatch and the feature gate.
///
/// Cheap to clone; every component is shared.
///
/// # Example
///
/// ```
/// use portico_core::{Request, Response};
/// use portico_filters::{FilterPipeline, FilterRegistry, FnRequestFilter};
/// use http::{Method, StatusCode};
///
/// struct GetUser;
///
/// # tokio_test::block_on(async {
/// let pipeline = FilterPipeline::builder()
///     .registry(
///         FilterRegistry::builder()
///             .request_attribute::<GetUser>(-1, FnRequestFilter::new("auth", |req, res, _dto| {
///                 if req.header("authorization").is_none() {
///                     res.end_with(StatusCode::UNAUTHORIZED, "text/plain", "")?;
///                 }
///                 Ok(())
///             }))
///             .build(),
///     )
///     .build();
///
/// let mut req = Request::new(Method::GET, "/users/1".parse().unwrap());
/// let mut res = Response::new();
/// let closed = pipeline.run_request_filters(&mut req, &mut res, &GetUser).await.unwrap();
/// assert!(closed);
/// assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
/// # });
/// ```
#[derive(Clone)]
pub struct FilterPipeline {
    registry: Arc<FilterRegistry>,
    errors: Arc<ErrorHandlerResolver>,
    gate: Arc<FeatureGate>,
    wiring: Arc<dyn FilterWiring>,
    exceptions: Arc<ExceptionTranslator>,
}

impl FilterPipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> FilterPipelineBuilder {
        FilterPipelineBuilder::new()
    }

    /// The filter registrations.
    #[must_use]
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// The error handler resolver.
    #[must_use]
    pub fn error_handlers(&self) -> &ErrorHandlerResolver {
        &self.errors
    }

    /// The feature gate.
    #[must_use]
    pub fn feature_gate(&self) -> &FeatureGate {
        &self.gate
    }

    /// Runs the global pre-request filters.
    ///
    /// Returns whether the response is closed afterwards.
    pub async fn run_pre_request_filters(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> HostResult<bool> {
        if res.is_closed() {
            debug!(phase = PRE_REQUEST, "response already closed, skipping phase");
            return Ok(true);
        }

        let span = info_span!("Executing Pre-Request Filters", request_id = %req.id());
        self.pre_request_phase(req, res).instrument(span).await
    }

    async fn pre_request_phase(&self, req: &mut Request, res: &mut Response) -> HostResult<bool> {
        let _timer = PhaseTimer::start(PRE_REQUEST);

        for filter in self.registry.pre_request_filters() {
            trace!(filter = filter.name(), "running pre-request filter");
            filter.execute(req, res).await?;
            if self.stop_after(PRE_REQUEST, TIER_GLOBAL, filter.name(), res) {
                return Ok(true);
            }
        }
        Ok(res.is_closed())
    }

    /// Runs the request filters for `dto`.
    ///
    /// Returns whether the response is closed afterwards.
    pub async fn run_request_filters(
        &self,
        req: &mut Request,
        res: &mut Response,
        dto: &dyn Dto,
    ) -> HostResult<bool> {
        if res.is_closed() {
            debug!(phase = REQUEST, "response already closed, skipping phase");
            return Ok(true);
        }

        let dto = dto.concrete();
        let span = info_span!(
            "Executing Request Filters",
            request_id = %req.id(),
            dto = dto.dto_type_name(),
        );
        self.request_phase(req, res, dto).instrument(span).await
    }

    async fn request_phase(
        &self,
        req: &mut Request,
        res: &mut Response,
        dto: &dyn Dto,
    ) -> HostResult<bool> {
        let _timer = PhaseTimer::start(REQUEST);
        let dto_type = dto.dto_type_id();

        let attributes = self.registry.attributes().request_filter_attributes(dto_type);
        let (before, after) = attributes.split_at(global_partition(&attributes));

        for attribute in before {
            if self.run_request_attribute(attribute, req, res, dto).await? {
                return Ok(true);
            }
        }

        let globals = self
            .registry
            .request_filters()
            .iter()
            .chain(self.registry.typed_request_filters(dto_type));
        for filter in globals {
            trace!(filter = filter.name(), "running global request filter");
            filter.execute(req, res, dto).await?;
            if self.stop_after(REQUEST, TIER_GLOBAL, filter.name(), res) {
                return Ok(true);
            }
        }

        for attribute in after {
            if self.run_request_attribute(attribute, req, res, dto).await? {
                return Ok(true);
            }
        }

        Ok(res.is_closed())
    }

    async fn run_request_attribute(
        &self,
        attribute: &RequestFilterAttribute,
        req: &mut Request,
        res: &mut Response,
        dto: &dyn Dto,
    ) -> HostResult<bool> {
        let filter = attribute.filter();
        let info = FilterInfo {
            name: filter.name(),
            priority: attribute.priority(),
            dto_type: dto.dto_type_name(),
        };

        let wired = WiringGuard::acquire(self.wiring.as_ref(), info, req);
        let outcome = filter.execute(req, res, dto).await;
        drop(wired);
        outcome?;
        Ok(self.stop_after(REQUEST, TIER_ATTRIBUTE, info.name, res))
    }

    /// Runs the response filters for a service's output.
    ///
    /// Attribute and typed filters are keyed by the output's response DTO.
    /// Outputs without one (errors, raw streams) only get the global
    /// response filters.
    ///
    /// Returns whether the response is closed afterwards.
    pub async fn run_response_filters(
        &self,
        req: &mut Request,
        res: &mut Response,
        output: &ServiceOutput,
    ) -> HostResult<bool> {
        if res.is_closed() {
            debug!(phase = RESPONSE, "response already closed, skipping phase");
            return Ok(true);
        }

        let span = info_span!(
            "Executing Response Filters",
            request_id = %req.id(),
            dto = output.response_dto().map(|dto| dto.dto_type_name()),
        );
        self.response_phase(req, res, output).instrument(span).await
    }

    async fn response_phase(
        &self,
        req: &mut Request,
        res: &mut Response,
        output: &ServiceOutput,
    ) -> HostResult<bool> {
        let _timer = PhaseTimer::start(RESPONSE);

        let Some(dto) = output.response_dto() else {
            return self
                .run_global_response_filters(self.registry.response_filters(), req, res, output)
                .await;
        };
        let dto_type = dto.dto_type_id();

        let attributes = self.registry.attributes().response_filter_attributes(dto_type);
        let (before, after) = attributes.split_at(global_partition(&attributes));

        let dto_name = dto.dto_type_name();

        for attribute in before {
            if self
                .run_response_attribute(attribute, dto_name, req, res, output)
                .await?
            {
                return Ok(true);
            }
        }

        let globals = [
            self.registry.response_filters(),
            self.registry.typed_response_filters(dto_type),
        ];
        for filters in globals {
            if self
                .run_global_response_filters(filters, req, res, output)
                .await?
            {
                return Ok(true);
            }
        }

        for attribute in after {
            if self
                .run_response_attribute(attribute, dto_name, req, res, output)
                .await?
            {
                return Ok(true);
            }
        }

        Ok(res.is_closed())
    }

    async fn run_global_response_filters(
        &self,
        filters: &[BoxedResponseFilter],
        req: &mut Request,
        res: &mut Response,
        output: &ServiceOutput,
    ) -> HostResult<bool> {
        for filter in filters {
            trace!(filter = filter.name(), "running global response filter");
            filter.execute(req, res, output).await?;
            if self.stop_after(RESPONSE, TIER_GLOBAL, filter.name(), res) {
                return Ok(true);
            }
        }
        Ok(res.is_closed())
    }

    async fn run_response_attribute(
        &self,
        attribute: &ResponseFilterAttribute,
        dto_type: &'static str,
        req: &mut Request,
        res: &mut Response,
        output: &ServiceOutput,
    ) -> HostResult<bool> {
        let filter = attribute.filter();
        let info = FilterInfo {
            name: filter.name(),
            priority: attribute.priority(),
            dto_type,
        };

        let wired = WiringGuard::acquire(self.wiring.as_ref(), info, req);
        let outcome = filter.execute(req, res, output).await;
        drop(wired);
        outcome?;
        Ok(self.stop_after(RESPONSE, TIER_ATTRIBUTE, info.name, res))
    }

    /// Bookkeeping after a filter returned. `true` means stop.
    fn stop_after(
        &self,
        phase: &'static str,
        tier: &'static str,
        filter: &'static str,
        res: &Response,
    ) -> bool {
        record_filter_executed(phase, tier);
        if !res.is_closed() {
            return false;
        }
        debug!(
            phase,
            filter,
            tier,
            "response closed by filter, skipping remaining filters"
        );
        record_short_circuit(phase, filter);
        true
    }

    /// Answers the exchange with an error handler.
    ///
    /// Sets the status description, then hands the exchange to the
    /// status-specific handler, the global HTML handler, or the not-found
    /// handler, whichever exists first. A closed response is left
    /// untouched and no handler runs.
    pub async fn handle_error_response(
        &self,
        req: &mut Request,
        res: &mut Response,
        status: StatusCode,
        description: Option<&str>,
    ) -> HostResult<()> {
        if res.is_closed() {
            debug!(
                status = status.as_u16(),
                "response already closed, not dispatching error"
            );
            return Ok(());
        }

        record_error_response(status.as_u16());
        let span = info_span!(
            "Handling Error Response",
            request_id = %req.id(),
            status = status.as_u16(),
        );
        self.errors
            .dispatch(req, res, status, description)
            .instrument(span)
            .await
    }

    /// Checks whether the request may reach metadata pages, answering it
    /// with 403 through [`handle_error_response`](Self::handle_error_response)
    /// when it may not.
    ///
    /// Returns `Ok(false)` once the denial has been handled.
    pub async fn has_access_to_metadata(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> HostResult<bool> {
        let Some(reason) = self.gate.check_metadata_access(req) else {
            return Ok(true);
        };
        self.handle_error_response(req, res, StatusCode::FORBIDDEN, Some(reason))
            .await?;
        Ok(false)
    }

    /// Builds the error payload for `error`.
    #[must_use]
    pub fn to_response_status(&self, error: &HostError) -> ResponseStatus {
        self.exceptions.to_response_status(error)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("registry", &self.registry)
            .field("errors", &self.errors)
            .field("gate", &self.gate)
            .field("exceptions", &self.exceptions)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`FilterPipeline`].
///
/// Every component defaults to its permissive form: no filters, built-in
/// error handlers, all features enabled, [`ContainerWiring`].
pub struct FilterPipelineBuilder {
    registry: FilterRegistry,
    errors: ErrorHandlerResolver,
    gate: FeatureGate,
    wiring: Arc<dyn FilterWiring>,
    exceptions: ExceptionTranslator,
}

impl FilterPipelineBuilder {
    /// Creates a builder with default components.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: FilterRegistry::empty(),
            errors: ErrorHandlerResolver::default(),
            gate: FeatureGate::default(),
            wiring: Arc::new(ContainerWiring),
            exceptions: ExceptionTranslator::default(),
        }
    }

    /// Sets the filter registrations.
    #[must_use]
    pub fn registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the error handler resolver.
    #[must_use]
    pub fn error_handlers(mut self, errors: ErrorHandlerResolver) -> Self {
        self.errors = errors;
        self
    }

    /// Sets the feature gate.
    #[must_use]
    pub fn feature_gate(mut self, gate: FeatureGate) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the wiring hooks run around attribute filters.
    #[must_use]
    pub fn wiring(mut self, wiring: impl FilterWiring) -> Self {
        self.wiring = Arc::new(wiring);
        self
    }

    /// Sets the exception translator.
    #[must_use]
    pub fn exceptions(mut self, exceptions: ExceptionTranslator) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> FilterPipeline {
        FilterPipeline {
            registry: Arc::new(self.registry),
            errors: Arc::new(self.errors),
            gate: Arc::new(self.gate),
            wiring: self.wiring,
            exceptions: Arc::new(self.exceptions),
        }
    }
}

impl Default for FilterPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
