//! What kind of requester sent a request.

use crate::bitset::flag_set;
use crate::request::Request;
use http::Method;
use std::net::IpAddr;

flag_set! {
    /// Describes the requester of one exchange: where it came from, how it
    /// connected, which method and format it used.
    ///
    /// As a visibility mask, [`RequestAttributes::ANY`] means "no
    /// restriction".
    pub struct RequestAttributes {
        /// Loopback peer.
        const LOCALHOST = 1 << 0, "localhost";
        /// Peer on a private or link-local network.
        const LOCAL_SUBNET = 1 << 1, "local_subnet";
        /// Any other peer.
        const EXTERNAL = 1 << 2, "external";
        /// Connected over TLS.
        const SECURE = 1 << 3, "secure";
        /// Connected in plain text.
        const IN_SECURE = 1 << 4, "in_secure";
        /// `HEAD`.
        const HTTP_HEAD = 1 << 5, "http_head";
        /// `GET`.
        const HTTP_GET = 1 << 6, "http_get";
        /// `POST`.
        const HTTP_POST = 1 << 7, "http_post";
        /// `PUT`.
        const HTTP_PUT = 1 << 8, "http_put";
        /// `DELETE`.
        const HTTP_DELETE = 1 << 9, "http_delete";
        /// `PATCH`.
        const HTTP_PATCH = 1 << 10, "http_patch";
        /// `OPTIONS`.
        const HTTP_OPTIONS = 1 << 11, "http_options";
        /// Any other method.
        const HTTP_OTHER = 1 << 12, "http_other";
        /// Fire-and-forget call.
        const ONE_WAY = 1 << 13, "one_way";
        /// Request/reply call.
        const REPLY = 1 << 14, "reply";
        /// SOAP 1.1 envelope.
        const SOAP11 = 1 << 15, "soap11";
        /// SOAP 1.2 envelope.
        const SOAP12 = 1 << 16, "soap12";
        /// XML.
        const XML = 1 << 17, "xml";
        /// JSON.
        const JSON = 1 << 18, "json";
        /// JSV.
        const JSV = 1 << 19, "jsv";
        /// Protocol Buffers.
        const PROTO_BUF = 1 << 20, "protobuf";
        /// CSV.
        const CSV = 1 << 21, "csv";
        /// HTML.
        const HTML = 1 << 22, "html";
        /// Wire.
        const WIRE = 1 << 23, "wire";
        /// MessagePack.
        const MSG_PACK = 1 << 24, "msgpack";
        /// Any other format.
        const FORMAT_OTHER = 1 << 25, "format_other";
        /// Served over HTTP.
        const HTTP = 1 << 26, "http";
        /// Served from a message queue.
        const MESSAGE_QUEUE = 1 << 27, "message_queue";
        /// Served over raw TCP.
        const TCP = 1 << 28, "tcp";
        /// Served from any other endpoint.
        const ENDPOINT_OTHER = 1 << 29, "endpoint_other";
        /// Loopback or private network.
        const INTERNAL_NETWORK_ACCESS = (1 << 0) | (1 << 1), "internal_network_access";
        /// Any network class.
        const ANY_NETWORK_ACCESS_TYPE = 0b111, "any_network_access_type";
        /// Either security mode.
        const ANY_SECURITY_MODE = (1 << 3) | (1 << 4), "any_security_mode";
        /// Any HTTP method.
        const ANY_HTTP_METHOD = 0xff << 5, "any_http_method";
        /// Either call style.
        const ANY_CALL_STYLE = (1 << 13) | (1 << 14), "any_call_style";
        /// Any format.
        const ANY_FORMAT = 0x7ff << 15, "any_format";
        /// Any endpoint.
        const ANY_ENDPOINT = 0xf << 26, "any_endpoint";
        /// No restriction.
        const ANY = (1 << 30) - 1, "any";
    }
}

impl RequestAttributes {
    /// Computes the attributes of a request.
    ///
    /// A request without a known peer is treated as [`EXTERNAL`](Self::EXTERNAL).
    /// Loopback peers count as both localhost and local subnet.
    ///
    /// ```
    /// use portico_core::{Request, RequestAttributes};
    /// use http::Method;
    ///
    /// let req = Request::new(Method::GET, "/metadata".parse().unwrap())
    ///     .with_remote_addr("127.0.0.1:5000".parse().unwrap())
    ///     .with_header("accept", "application/json");
    ///
    /// let attrs = RequestAttributes::from_request(&req);
    /// assert!(attrs.contains(RequestAttributes::LOCALHOST | RequestAttributes::HTTP_GET));
    /// assert!(attrs.contains(RequestAttributes::JSON | RequestAttributes::IN_SECURE));
    /// ```
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        let mut attrs = Self::HTTP | Self::REPLY;

        attrs |= match req.remote_addr().map(|addr| addr.ip()) {
            Some(ip) => Self::from_ip(ip),
            None => Self::EXTERNAL,
        };

        attrs |= if req.is_secure() {
            Self::SECURE
        } else {
            Self::IN_SECURE
        };

        attrs |= Self::from_method(req.method());

        let format = req
            .header("accept")
            .filter(|accept| !accept.trim().is_empty() && !accept.contains("*/*"))
            .or_else(|| req.header("content-type"));
        attrs |= format.map_or(Self::NONE, Self::from_content_type);

        attrs
    }

    /// Classifies a peer address.
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        if ip.is_loopback() {
            return Self::LOCALHOST | Self::LOCAL_SUBNET;
        }
        let private = match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => {
                let first = v6.segments()[0];
                // fc00::/7 unique local, fe80::/10 link local
                (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
            }
        };
        if private {
            Self::LOCAL_SUBNET
        } else {
            Self::EXTERNAL
        }
    }

    /// Maps an HTTP method.
    #[must_use]
    pub fn from_method(method: &Method) -> Self {
        match *method {
            Method::HEAD => Self::HTTP_HEAD,
            Method::GET => Self::HTTP_GET,
            Method::POST => Self::HTTP_POST,
            Method::PUT => Self::HTTP_PUT,
            Method::DELETE => Self::HTTP_DELETE,
            Method::PATCH => Self::HTTP_PATCH,
            Method::OPTIONS => Self::HTTP_OPTIONS,
            _ => Self::HTTP_OTHER,
        }
    }

    /// Maps the first media type of a content type or accept header.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        let media_type = content_type
            .split([',', ';'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/json" | "text/json" => Self::JSON,
            "application/xml" => Self::XML,
            "text/xml" => Self::SOAP11,
            "application/soap+xml" => Self::SOAP12,
            "application/jsv" | "text/jsv" => Self::JSV,
            "text/csv" => Self::CSV,
            "text/html" => Self::HTML,
            "application/x-protobuf" => Self::PROTO_BUF,
            "application/x-msgpack" => Self::MSG_PACK,
            "application/x-wire" => Self::WIRE,
            "" => Self::NONE,
            _ => Self::FORMAT_OTHER,
        }
    }
}
