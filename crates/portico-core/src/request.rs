//! The request half of an exchange.

use crate::context::{Items, RequestId};
use crate::di::Container;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use std::net::SocketAddr;
use std::sync::Arc;

/// One in-flight HTTP request.
///
/// Built by the transport, owned by it for the duration of one exchange, and
/// lent to filters as `&mut Request`.
///
/// # Example
///
/// ```
/// use portico_core::Request;
/// use http::Method;
///
/// let req = Request::new(Method::GET, "/users/7?format=json".parse().unwrap())
///     .with_operation_name("GetUser")
///     .with_header("accept", "application/json");
///
/// assert_eq!(req.operation_name(), "GetUser");
/// assert_eq!(req.query_param("format"), Some("json"));
/// assert_eq!(req.header("accept"), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    operation_name: String,
    remote_addr: Option<SocketAddr>,
    secure: bool,
    items: Items,
    services: Arc<Container>,
}

impl Request {
    /// Creates a request with an empty body and no services.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: RequestId::new(),
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            operation_name: String::new(),
            remote_addr: None,
            secure: false,
            items: Items::new(),
            services: Arc::new(Container::new()),
        }
    }

    /// Sets the request ID, e.g. one propagated by an upstream proxy.
    #[must_use]
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the name of the operation routing resolved this request to.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = name.into();
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Marks the request as received over TLS.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Attaches the host's service container.
    #[must_use]
    pub fn with_services(mut self, services: Arc<Container>) -> Self {
        self.services = services;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns all headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw value of a query string parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.uri.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then_some(value)
        })
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the operation name, empty until routing resolved one.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Sets the operation name.
    pub fn set_operation_name(&mut self, name: impl Into<String>) {
        self.operation_name = name.into();
    }

    /// Returns the peer address, if the transport knows it.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns `true` if the request arrived over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns the request's item bag.
    #[must_use]
    pub fn items(&self) -> &Items {
        &self.items
    }

    /// Returns the request's item bag for writing.
    pub fn items_mut(&mut self) -> &mut Items {
        &mut self.items
    }

    /// Resolves a service from the host container.
    #[must_use]
    pub fn try_resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services.resolve()
    }

    /// Returns the host container.
    #[must_use]
    pub fn services(&self) -> &Arc<Container> {
        &self.services
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut req = Self::new(parts.method, parts.uri);
        req.headers = parts.headers;
        req.body = body;
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let req = Request::new(Method::GET, "/a?x=1&flag&y=two".parse().unwrap());
        assert_eq!(req.query_param("x"), Some("1"));
        assert_eq!(req.query_param("y"), Some("two"));
        assert_eq!(req.query_param("flag"), Some(""));
        assert_eq!(req.query_param("z"), None);
    }

    #[test]
    fn test_query_param_without_query() {
        let req = Request::new(Method::GET, "/a".parse().unwrap());
        assert_eq!(req.query_param("x"), None);
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let req = Request::new(Method::GET, "/".parse().unwrap()).with_header("bad name", "v");
        assert!(req.headers().is_empty());
    }

    #[test]
    fn test_from_http_request() {
        let http_req = http::Request::builder()
            .method(Method::POST)
            .uri("/orders")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let req = Request::from(http_req);
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/orders");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body().as_ref(), b"{}");
    }

    #[test]
    fn test_try_resolve() {
        struct Greeter;

        let mut container = Container::new();
        container.register(Arc::new(Greeter));

        let req = Request::new(Method::GET, "/".parse().unwrap())
            .with_services(Arc::new(container));
        assert!(req.try_resolve::<Greeter>().is_some());
        assert!(req.try_resolve::<String>().is_none());
    }
}
