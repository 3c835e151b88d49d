//! Host capabilities that an administrator can switch off.

use crate::bitset::flag_set;

flag_set! {
    /// A set of host capabilities.
    ///
    /// [`Feature::ALL`] is a sentinel: when it is the enabled set every
    /// capability check passes, including checks for flags added later.
    ///
    /// # Example
    ///
    /// ```
    /// use portico_core::Feature;
    ///
    /// let enabled = Feature::JSON | Feature::METADATA;
    /// assert!(enabled.contains(Feature::JSON));
    /// assert!(!enabled.contains(Feature::JSON | Feature::XML));
    /// assert!(Feature::ALL.contains(Feature::XML | Feature::CSV));
    /// ```
    pub struct Feature {
        /// Metadata and introspection pages.
        const METADATA = 1 << 0, "metadata";
        /// Built-in `/json/reply/{Operation}` style routes.
        const PREDEFINED_ROUTES = 1 << 1, "predefined_routes";
        /// Request-info debug endpoint.
        const REQUEST_INFO = 1 << 2, "request_info";
        /// JSON format.
        const JSON = 1 << 3, "json";
        /// XML format.
        const XML = 1 << 4, "xml";
        /// JSV format.
        const JSV = 1 << 5, "jsv";
        /// SOAP 1.1 endpoint.
        const SOAP11 = 1 << 6, "soap11";
        /// SOAP 1.2 endpoint.
        const SOAP12 = 1 << 7, "soap12";
        /// CSV format.
        const CSV = 1 << 8, "csv";
        /// HTML format.
        const HTML = 1 << 9, "html";
        /// Any format registered by a plugin.
        const CUSTOM_FORMAT = 1 << 10, "custom_format";
        /// Protocol Buffers format.
        const PROTO_BUF = 1 << 11, "protobuf";
        /// MessagePack format.
        const MSG_PACK = 1 << 12, "msgpack";
        /// Wire format.
        const WIRE = 1 << 13, "wire";
        /// Both SOAP endpoints.
        const SOAP = (1 << 6) | (1 << 7), "soap";
        /// Every capability, present and future.
        const ALL = u64::MAX, "all";
    }
}

impl Feature {
    /// Maps a content type to the feature that serves it.
    ///
    /// Parameters such as `; charset=utf-8` are ignored. Unknown content
    /// types map to [`Feature::CUSTOM_FORMAT`].
    ///
    /// ```
    /// use portico_core::Feature;
    ///
    /// assert_eq!(Feature::from_content_type("application/json; charset=utf-8"), Feature::JSON);
    /// assert_eq!(Feature::from_content_type("text/xml"), Feature::SOAP11);
    /// assert_eq!(Feature::from_content_type("application/x-yaml"), Feature::CUSTOM_FORMAT);
    /// ```
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/json" | "text/json" => Self::JSON,
            "application/xml" => Self::XML,
            "application/jsv" | "text/jsv" => Self::JSV,
            "text/csv" => Self::CSV,
            "text/html" => Self::HTML,
            "text/xml" => Self::SOAP11,
            "application/soap+xml" => Self::SOAP12,
            "application/x-protobuf" => Self::PROTO_BUF,
            "application/x-msgpack" => Self::MSG_PACK,
            "application/x-wire" => Self::WIRE,
            _ => Self::CUSTOM_FORMAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contains_everything() {
        assert!(Feature::ALL.contains(Feature::METADATA));
        assert!(Feature::ALL.contains(Feature::from_bits(1 << 60)));
        assert!(Feature::ALL.contains(Feature::NONE));
    }

    #[test]
    fn test_soap_is_both_endpoints() {
        assert_eq!(Feature::SOAP, Feature::SOAP11 | Feature::SOAP12);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Feature::from_name("JSON"), Some(Feature::JSON));
        assert_eq!(Feature::from_name(" metadata "), Some(Feature::METADATA));
        assert_eq!(Feature::from_name("all"), Some(Feature::ALL));
        assert_eq!(Feature::from_name("yaml"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Feature::ALL.to_string(), "all");
        assert_eq!((Feature::JSON | Feature::CSV).to_string(), "json, csv");
        assert_eq!(Feature::SOAP.to_string(), "soap");
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(Feature::from_content_type("text/json"), Feature::JSON);
        assert_eq!(Feature::from_content_type("APPLICATION/XML"), Feature::XML);
        assert_eq!(Feature::from_content_type("text/jsv"), Feature::JSV);
        assert_eq!(Feature::from_content_type("text/csv"), Feature::CSV);
        assert_eq!(Feature::from_content_type("text/html; charset=utf-8"), Feature::HTML);
        assert_eq!(
            Feature::from_content_type("application/soap+xml"),
            Feature::SOAP12
        );
        assert_eq!(
            Feature::from_content_type("application/x-protobuf"),
            Feature::PROTO_BUF
        );
        assert_eq!(
            Feature::from_content_type("application/x-msgpack"),
            Feature::MSG_PACK
        );
        assert_eq!(Feature::from_content_type("application/x-wire"), Feature::WIRE);
        assert_eq!(Feature::from_content_type(""), Feature::CUSTOM_FORMAT);
    }

    proptest::proptest! {
        #[test]
        fn prop_all_sentinel_contains_any_flag(bits in proptest::prelude::any::<u64>()) {
            proptest::prop_assert!(Feature::ALL.contains(Feature::from_bits(bits)));
        }

        #[test]
        fn prop_contains_matches_bitwise_and(enabled in proptest::prelude::any::<u64>(), flag in proptest::prelude::any::<u64>()) {
            let enabled = Feature::from_bits(enabled);
            let flag = Feature::from_bits(flag);
            proptest::prop_assert_eq!(enabled.contains(flag), (enabled & flag) == flag);
        }
    }
}
