//! Error handlers and the status-code fallback chain.
//!
//! [`ErrorHandlerResolver`] picks the handler that answers a failed or
//! unmapped exchange:
//!
//! ```text
//! status override ─▶ built-in 403 / 404 ─▶ None
//! ```
//!
//! [`ErrorHandlerResolver::dispatch`] extends that chain with the global HTML
//! handler and the unconditional not-found handler, so some handler always
//! answers.

use crate::filter::BoxFuture;
use http::StatusCode;
use portico_core::{HostResult, Request, Response};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A handler that writes a terminal error response.
pub trait ErrorHttpHandler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Writes the response. `operation_name` is the operation the request
    /// was routed to, or empty if routing never happened.
    fn process_request<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        operation_name: &'a str,
    ) -> BoxFuture<'a, HostResult<()>>;
}

/// Built-in handler for `403 Forbidden`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForbiddenHandler;

impl ErrorHttpHandler for ForbiddenHandler {
    fn name(&self) -> &'static str {
        "forbidden"
    }

    fn process_request<'a>(
        &'a self,
        _req: &'a mut Request,
        res: &'a mut Response,
        _operation_name: &'a str,
    ) -> BoxFuture<'a, HostResult<()>> {
        Box::pin(async move {
            let body = match res.status_description() {
                Some(description) => format!("Forbidden\n\n{description}"),
                None => "Forbidden".to_string(),
            };
            res.end_with(StatusCode::FORBIDDEN, "text/plain", body)
        })
    }
}

/// Built-in handler for `404 Not Found`.
///
/// With `debug_mode` on, the body lists the request's method, path and
/// operation name.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler {
    debug_mode: bool,
}

impl NotFoundHandler {
    /// Creates the handler.
    #[must_use]
    pub const fn new(debug_mode: bool) -> Self {
        Self { debug_mode }
    }
}

impl ErrorHttpHandler for NotFoundHandler {
    fn name(&self) -> &'static str {
        "not_found"
    }

    fn process_request<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        operation_name: &'a str,
    ) -> BoxFuture<'a, HostResult<()>> {
        Box::pin(async move {
            let mut body = String::from("Handler for Request not found");
            if let Some(description) = res.status_description() {
                body.push_str(": ");
                body.push_str(description);
            }
            if self.debug_mode {
                body.push_str(&format!(
                    "\n\nRequest.HttpMethod: {}\nRequest.PathInfo: {}\nRequest.OperationName: {}",
                    req.method(),
                    req.path(),
                    operation_name,
                ));
            }
            res.end_with(StatusCode::NOT_FOUND, "text/plain", body)
        })
    }
}

/// Resolves which handler answers a status code.
///
/// Frozen at startup; shared read-only across requests.
#[derive(Clone)]
pub struct ErrorHandlerResolver {
    custom: HashMap<StatusCode, Arc<dyn ErrorHttpHandler>>,
    global_html: Option<Arc<dyn ErrorHttpHandler>>,
    forbidden: Arc<dyn ErrorHttpHandler>,
    not_found: Arc<dyn ErrorHttpHandler>,
}

impl ErrorHandlerResolver {
    /// Creates a new resolver builder.
    #[must_use]
    pub fn builder() -> ErrorHandlerResolverBuilder {
        ErrorHandlerResolverBuilder::default()
    }

    /// Returns the most specific handler for `status`.
    ///
    /// An override registered for the exact status always wins. Otherwise
    /// 403 and 404 get the built-in handlers, and every other status
    /// resolves to `None`.
    #[must_use]
    pub fn resolve_error_handler(&self, status: StatusCode) -> Option<Arc<dyn ErrorHttpHandler>> {
        if let Some(handler) = self.custom.get(&status) {
            return Some(Arc::clone(handler));
        }
        match status {
            StatusCode::FORBIDDEN => Some(Arc::clone(&self.forbidden)),
            StatusCode::NOT_FOUND => Some(Arc::clone(&self.not_found)),
            _ => None,
        }
    }

    /// Returns the 404 override if registered, else the built-in
    /// not-found handler. Never fails.
    #[must_use]
    pub fn resolve_not_found_handler(&self) -> Arc<dyn ErrorHttpHandler> {
        self.custom
            .get(&StatusCode::NOT_FOUND)
            .map_or_else(|| Arc::clone(&self.not_found), Arc::clone)
    }

    /// The generic handler configured for every unmapped error, if any.
    #[must_use]
    pub fn global_html_error_handler(&self) -> Option<Arc<dyn ErrorHttpHandler>> {
        self.global_html.clone()
    }

    /// Answers an exchange with the handler chosen for `status`.
    ///
    /// Tries the status-specific handler, then the global HTML handler, then
    /// the not-found handler. Does nothing if `res` is already closed.
    pub async fn dispatch(
        &self,
        req: &mut Request,
        res: &mut Response,
        status: StatusCode,
        description: Option<&str>,
    ) -> HostResult<()> {
        if res.is_closed() {
            return Ok(());
        }

        res.set_status(status)?;
        res.set_status_description(description.map(str::to_string))?;

        let handler = self
            .resolve_error_handler(status)
            .or_else(|| self.global_html_error_handler())
            .unwrap_or_else(|| self.resolve_not_found_handler());

        debug!(
            handler = handler.name(),
            status = status.as_u16(),
            "dispatching error response"
        );

        let operation_name = req.operation_name().to_string();
        handler.process_request(req, res, &operation_name).await
    }
}

impl Default for ErrorHandlerResolver {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ErrorHandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<_> = self.custom.keys().map(StatusCode::as_u16).collect();
        overrides.sort_unstable();
        f.debug_struct("ErrorHandlerResolver")
            .field("overrides", &overrides)
            .field("global_html", &self.global_html.as_ref().map(|h| h.name()))
            .finish_non_exhaustive()
    }
}

/// Builder for an [`ErrorHandlerResolver`].
#[derive(Default)]
pub struct ErrorHandlerResolverBuilder {
    custom: HashMap<StatusCode, Arc<dyn ErrorHttpHandler>>,
    global_html: Option<Arc<dyn ErrorHttpHandler>>,
    debug_mode: bool,
}

impl ErrorHandlerResolverBuilder {
    /// Registers an override for one status code. A later registration for
    /// the same code replaces the earlier one.
    #[must_use]
    pub fn custom_handler(mut self, status: StatusCode, handler: impl ErrorHttpHandler) -> Self {
        self.custom.insert(status, Arc::new(handler));
        self
    }

    /// Sets the generic handler used when no status-specific one applies.
    #[must_use]
    pub fn global_html_error_handler(mut self, handler: impl ErrorHttpHandler) -> Self {
        self.global_html = Some(Arc::new(handler));
        self
    }

    /// Makes the built-in not-found handler print request details.
    #[must_use]
    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Freezes the handler map.
    #[must_use]
    pub fn build(self) -> ErrorHandlerResolver {
        ErrorHandlerResolver {
            custom: self.custom,
            global_html: self.global_html,
            forbidden: Arc::new(ForbiddenHandler),
            not_found: Arc::new(NotFoundHandler::new(self.debug_mode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    struct Teapot;

    impl ErrorHttpHandler for Teapot {
        fn name(&self) -> &'static str {
            "teapot"
        }

        fn process_request<'a>(
            &'a self,
            _req: &'a mut Request,
            res: &'a mut Response,
            _operation_name: &'a str,
        ) -> BoxFuture<'a, HostResult<()>> {
            Box::pin(async move { res.end_with(StatusCode::IM_A_TEAPOT, "text/plain", "teapot") })
        }
    }

    fn request() -> Request {
        Request::new(Method::GET, "/users/7".parse().unwrap())
    }

    #[test]
    fn test_builtin_defaults() {
        let resolver = ErrorHandlerResolver::default();
        assert_eq!(
            resolver
                .resolve_error_handler(StatusCode::FORBIDDEN)
                .map(|h| h.name()),
            Some("forbidden")
        );
        assert_eq!(
            resolver
                .resolve_error_handler(StatusCode::NOT_FOUND)
                .map(|h| h.name()),
            Some("not_found")
        );
        assert!(resolver
            .resolve_error_handler(StatusCode::INTERNAL_SERVER_ERROR)
            .is_none());
        assert!(resolver.global_html_error_handler().is_none());
    }

    #[test]
    fn test_override_wins() {
        let resolver = ErrorHandlerResolver::builder()
            .custom_handler(StatusCode::FORBIDDEN, Teapot)
            .custom_handler(StatusCode::NOT_FOUND, Teapot)
            .custom_handler(StatusCode::BAD_GATEWAY, Teapot)
            .build();

        for status in [StatusCode::FORBIDDEN, StatusCode::NOT_FOUND, StatusCode::BAD_GATEWAY] {
            assert_eq!(
                resolver.resolve_error_handler(status).map(|h| h.name()),
                Some("teapot")
            );
        }
        assert_eq!(resolver.resolve_not_found_handler().name(), "teapot");
    }

    #[test]
    fn test_not_found_fallback_is_builtin() {
        let resolver = ErrorHandlerResolver::builder()
            .custom_handler(StatusCode::FORBIDDEN, Teapot)
            .build();
        assert_eq!(resolver.resolve_not_found_handler().name(), "not_found");
    }

    #[tokio::test]
    async fn test_forbidden_handler_closes_response() {
        let mut req = request();
        let mut res = Response::new();
        res.set_status_description(Some("Metadata Not Available".into()))
            .unwrap();

        ForbiddenHandler
            .process_request(&mut req, &mut res, "")
            .await
            .unwrap();

        assert!(res.is_closed());
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.body(), b"Forbidden\n\nMetadata Not Available");
    }

    #[tokio::test]
    async fn test_not_found_details_only_in_debug() {
        let mut req = request();
        let mut res = Response::new();
        NotFoundHandler::new(false)
            .process_request(&mut req, &mut res, "GetUser")
            .await
            .unwrap();
        assert_eq!(res.body(), b"Handler for Request not found");

        let mut res = Response::new();
        NotFoundHandler::new(true)
            .process_request(&mut req, &mut res, "GetUser")
            .await
            .unwrap();
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert!(body.contains("Request.HttpMethod: GET"));
        assert!(body.contains("Request.PathInfo: /users/7"));
        assert!(body.contains("Request.OperationName: GetUser"));
    }

    #[tokio::test]
    async fn test_dispatch_prefers_status_handler() {
        let resolver = ErrorHandlerResolver::builder()
            .custom_handler(StatusCode::BAD_GATEWAY, Teapot)
            .build();
        let mut req = request();
        let mut res = Response::new();

        resolver
            .dispatch(&mut req, &mut res, StatusCode::BAD_GATEWAY, None)
            .await
            .unwrap();
        assert_eq!(res.body(), b"teapot");
    }

    #[tokio::test]
    async fn test_dispatch_falls_back_to_global_then_not_found() {
        let with_global = ErrorHandlerResolver::builder()
            .global_html_error_handler(Teapot)
            .build();
        let mut req = request();
        let mut res = Response::new();
        with_global
            .dispatch(&mut req, &mut res, StatusCode::SERVICE_UNAVAILABLE, None)
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);

        let bare = ErrorHandlerResolver::default();
        let mut res = Response::new();
        bare.dispatch(
            &mut req,
            &mut res,
            StatusCode::SERVICE_UNAVAILABLE,
            Some("down for maintenance"),
        )
        .await
        .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            res.body(),
            b"Handler for Request not found: down for maintenance"
        );
    }

    #[tokio::test]
    async fn test_dispatch_on_closed_response_is_noop() {
        let resolver = ErrorHandlerResolver::default();
        let mut req = request();
        let mut res = Response::new();
        res.end();

        resolver
            .dispatch(&mut req, &mut res, StatusCode::FORBIDDEN, Some("denied"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.status_description().is_none());
        assert!(res.body().is_empty());
    }

    #[test]
    fn test_debug_lists_overrides() {
        let resolver = ErrorHandlerResolver::builder()
            .custom_handler(StatusCode::BAD_GATEWAY, Teapot)
            .global_html_error_handler(Teapot)
            .build();
        let rendered = format!("{resolver:?}");
        assert!(rendered.contains("502"));
        assert!(rendered.contains("teapot"));
    }
}
