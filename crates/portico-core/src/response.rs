//! The response half of an exchange.
//!
//! A [`Response`] starts open. Once [`Response::end`] is called it is
//! closed for good: every mutator returns [`HostError::ResponseClosed`] and
//! leaves the response untouched, and the filter pipeline stops invoking
//! filters as soon as it observes the flag.

use crate::context::Items;
use crate::error::{HostError, HostResult};
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;

/// One in-flight HTTP response.
///
/// # Example
///
/// ```
/// use portico_core::Response;
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.end_with(StatusCode::FORBIDDEN, "text/plain", "nope").unwrap();
///
/// assert!(res.is_closed());
/// assert!(res.write(b"more").is_err());
/// assert_eq!(res.body(), b"nope");
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    status_description: Option<String>,
    headers: HeaderMap,
    body: BytesMut,
    items: Items,
    closed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates an open `200 OK` response with an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            status_description: None,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            items: Items::new(),
            closed: false,
        }
    }

    /// Returns `true` once the response has been finalized.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> HostResult<()> {
        if self.closed {
            return Err(HostError::ResponseClosed);
        }
        Ok(())
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) -> HostResult<()> {
        self.ensure_open()?;
        self.status = status;
        Ok(())
    }

    /// Returns the status description (reason phrase override).
    #[must_use]
    pub fn status_description(&self) -> Option<&str> {
        self.status_description.as_deref()
    }

    /// Sets or clears the status description.
    pub fn set_status_description(&mut self, description: Option<String>) -> HostResult<()> {
        self.ensure_open()?;
        self.status_description = description;
        Ok(())
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing previous values.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> HostResult<()> {
        self.ensure_open()?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Sets the `content-type` header.
    pub fn set_content_type(&mut self, content_type: &str) -> HostResult<()> {
        let value = content_type_value(content_type)?;
        self.insert_header(CONTENT_TYPE, value)
    }

    /// Appends bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) -> HostResult<()> {
        self.ensure_open()?;
        self.body.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Closes the response. Closing twice is a no-op.
    pub fn end(&mut self) {
        self.closed = true;
    }

    /// Writes a complete response and closes it.
    ///
    /// Nothing is changed if `content_type` is not a valid header value.
    pub fn end_with(
        &mut self,
        status: StatusCode,
        content_type: &str,
        body: impl AsRef<[u8]>,
    ) -> HostResult<()> {
        let content_type = content_type_value(content_type)?;
        self.set_status(status)?;
        self.insert_header(CONTENT_TYPE, content_type)?;
        self.write(body.as_ref())?;
        self.end();
        Ok(())
    }

    /// Returns the response's item bag.
    #[must_use]
    pub fn items(&self) -> &Items {
        &self.items
    }

    /// Returns the response's item bag for writing.
    pub fn items_mut(&mut self) -> &mut Items {
        &mut self.items
    }

    /// Converts into an `http::Response` for the transport.
    pub fn into_http(self) -> HostResult<http::Response<Full<Bytes>>> {
        let mut builder = http::Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        builder
            .body(Full::new(self.body.freeze()))
            .map_err(|e| HostError::internal_with_source("failed to build response", e))
    }
}

fn content_type_value(content_type: &str) -> HostResult<HeaderValue> {
    HeaderValue::from_str(content_type)
        .map_err(|e| HostError::internal_with_source("invalid content type", e))
}
