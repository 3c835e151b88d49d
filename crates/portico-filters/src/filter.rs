//! Filter traits.
//!
//! Three kinds of filter run around a service invocation:
//!
//! - [`PreRequestFilter`] - before routing, so no DTO exists yet
//! - [`RequestFilter`] - after the request DTO was deserialized
//! - [`ResponseFilter`] - after the service produced its output
//!
//! A filter terminates the exchange cooperatively by closing the response
//! (`res.end()` / `res.end_with(..)`). Returning `Err` is the only
//! non-cooperative way out; the pipeline propagates it untouched.
//!
//! # Example
//!
//! ```
//! use portico_filters::{BoxFuture, RequestFilter};
//! use portico_core::{Dto, HostResult, Request, Response};
//! use http::StatusCode;
//!
//! struct RequireApiKey;
//!
//! impl RequestFilter for RequireApiKey {
//!     fn name(&self) -> &'static str {
//!         "require_api_key"
//!     }
//!
//!     fn execute<'a>(
//!         &'a self,
//!         req: &'a mut Request,
//!         res: &'a mut Response,
//!         _dto: &'a dyn Dto,
//!     ) -> BoxFuture<'a, HostResult<()>> {
//!         Box::pin(async move {
//!             if req.header("x-api-key").is_none() {
//!                 res.end_with(StatusCode::UNAUTHORIZED, "text/plain", "api key required")?;
//!             }
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use portico_core::{Dto, HostResult, Request, Response, ServiceOutput};
use std::future::Future;
use std::pin::Pin;

/// A boxed future, as returned by every filter.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A filter that runs before routing.
pub trait PreRequestFilter: Send + Sync + 'static {
    /// Name used in logs and wiring callbacks.
    fn name(&self) -> &'static str;

    /// Runs the filter.
    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HostResult<()>>;
}

/// A filter that runs after the request DTO is known.
pub trait RequestFilter: Send + Sync + 'static {
    /// Name used in logs and wiring callbacks.
    fn name(&self) -> &'static str;

    /// Runs the filter.
    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        dto: &'a dyn Dto,
    ) -> BoxFuture<'a, HostResult<()>>;
}

/// A filter that runs after the service produced its output.
pub trait ResponseFilter: Send + Sync + 'static {
    /// Name used in logs and wiring callbacks.
    fn name(&self) -> &'static str;

    /// Runs the filter.
    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        output: &'a ServiceOutput,
    ) -> BoxFuture<'a, HostResult<()>>;
}

/// A pre-request filter built from a synchronous closure.
///
/// ```
/// use portico_filters::FnPreRequestFilter;
///
/// let filter = FnPreRequestFilter::new("tag", |req, _res| {
///     req.items_mut().insert("tagged");
///     Ok(())
/// });
/// ```
pub struct FnPreRequestFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnPreRequestFilter<F> {
    /// Creates a new function-based filter.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HostResult<()> + Send + Sync + 'static,
    {
        Self { name, func }
    }
}

impl<F> PreRequestFilter for FnPreRequestFilter<F>
where
    F: Fn(&mut Request, &mut Response) -> HostResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HostResult<()>> {
        Box::pin(async move { (self.func)(req, res) })
    }
}

/// A request filter built from a synchronous closure.
pub struct FnRequestFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnRequestFilter<F> {
    /// Creates a new function-based filter.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Request, &mut Response, &dyn Dto) -> HostResult<()> + Send + Sync + 'static,
    {
        Self { name, func }
    }
}

impl<F> RequestFilter for FnRequestFilter<F>
where
    F: Fn(&mut Request, &mut Response, &dyn Dto) -> HostResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        dto: &'a dyn Dto,
    ) -> BoxFuture<'a, HostResult<()>> {
        Box::pin(async move { (self.func)(req, res, dto) })
    }
}

/// A response filter built from a synchronous closure.
pub struct FnResponseFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnResponseFilter<F> {
    /// Creates a new function-based filter.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Request, &mut Response, &ServiceOutput) -> HostResult<()> + Send + Sync + 'static,
    {
        Self { name, func }
    }
}

impl<F> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(&mut Request, &mut Response, &ServiceOutput) -> HostResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        output: &'a ServiceOutput,
    ) -> BoxFuture<'a, HostResult<()>> {
        Box::pin(async move { (self.func)(req, res, output) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use portico_core::HostError;

    struct Ping;

    fn request() -> Request {
        Request::new(Method::GET, "/ping".parse().unwrap())
    }

    #[tokio::test]
    async fn test_fn_pre_request_filter() {
        let filter = FnPreRequestFilter::new("close", |_req, res| {
            res.end_with(StatusCode::NO_CONTENT, "text/plain", "")
        });
        let mut req = request();
        let mut res = Response::new();

        assert_eq!(filter.name(), "close");
        filter.execute(&mut req, &mut res).await.unwrap();
        assert!(res.is_closed());
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_fn_request_filter_sees_dto() {
        let filter = FnRequestFilter::new("inspect", |req, _res, dto| {
            if dto.downcast_ref::<Ping>().is_some() {
                req.set_operation_name("Ping");
            }
            Ok(())
        });
        let mut req = request();
        let mut res = Response::new();

        filter.execute(&mut req, &mut res, &Ping).await.unwrap();
        assert_eq!(req.operation_name(), "Ping");
    }

    #[tokio::test]
    async fn test_fn_response_filter_propagates_error() {
        let filter = FnResponseFilter::new("fail", |_req, _res, _output| {
            Err(HostError::forbidden("no"))
        });
        let mut req = request();
        let mut res = Response::new();
        let output = ServiceOutput::dto(Ping);

        let result = filter.execute(&mut req, &mut res, &output).await;
        assert!(matches!(result, Err(HostError::Forbidden { .. })));
    }
}
