//! Capability checks and administrative overrides.

use portico_core::{Feature, HostError, HostResult, Request, RequestAttributes};
use portico_telemetry::metrics::record_feature_denial;
use tracing::warn;

const AUTH_SECRET_PARAM: &str = "authsecret";
const AUTH_SECRET_HEADER: &str = "x-auth-secret";

/// Status description sent when the metadata feature is off.
pub const METADATA_NOT_AVAILABLE: &str = "Metadata Not Available";

/// Status description sent when the requester may not see metadata.
pub const METADATA_NOT_VISIBLE: &str = "Metadata Not Visible";

/// Decides which capabilities a request may use.
///
/// # Example
///
/// ```
/// use portico_core::Feature;
/// use portico_filters::FeatureGate;
///
/// let gate = FeatureGate::new(Feature::JSON | Feature::METADATA);
/// assert!(gate.has_feature(Feature::JSON));
/// assert!(gate.assert_content_type("application/json").is_ok());
/// assert!(gate.assert_features(Feature::XML).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FeatureGate {
    enabled: Feature,
    metadata_visibility: RequestAttributes,
    admin_auth_secret: Option<String>,
}

impl Default for FeatureGate {
    fn default() -> Self {
        Self::new(Feature::ALL)
    }
}

impl FeatureGate {
    /// Creates a gate with unrestricted metadata visibility and no admin
    /// secret.
    #[must_use]
    pub fn new(enabled: Feature) -> Self {
        Self {
            enabled,
            metadata_visibility: RequestAttributes::ANY,
            admin_auth_secret: None,
        }
    }

    /// Restricts metadata to requesters carrying every flag in `mask`.
    #[must_use]
    pub fn with_metadata_visibility(mut self, mask: RequestAttributes) -> Self {
        self.metadata_visibility = mask;
        self
    }

    /// Sets the secret that unlocks administrative access.
    #[must_use]
    pub fn with_admin_auth_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_auth_secret = Some(secret.into());
        self
    }

    /// The enabled feature set.
    #[must_use]
    pub fn enabled(&self) -> Feature {
        self.enabled
    }

    /// The metadata visibility mask.
    #[must_use]
    pub fn metadata_visibility(&self) -> RequestAttributes {
        self.metadata_visibility
    }

    /// Returns `true` if every flag in `flag` is enabled.
    #[must_use]
    pub fn has_feature(&self, flag: Feature) -> bool {
        self.enabled.contains(flag)
    }

    /// Fails unless every flag in `flags` is enabled.
    pub fn assert_features(&self, flags: Feature) -> HostResult<()> {
        if self.enabled == Feature::ALL || self.has_feature(flags) {
            return Ok(());
        }

        let disabled = flags & !self.enabled;
        warn!(features = %disabled, "request used disabled features");
        record_feature_denial("feature_disabled");
        Err(HostError::unauthorized(format!(
            "'{disabled}' Features have been disabled by your administrator"
        )))
    }

    /// Fails unless the feature serving `content_type` is enabled.
    pub fn assert_content_type(&self, content_type: &str) -> HostResult<()> {
        if self.enabled == Feature::ALL {
            return Ok(());
        }
        self.assert_features(Feature::from_content_type(content_type))
    }

    /// Returns why `req` may not see metadata, or `None` if it may.
    #[must_use]
    pub fn metadata_denial(&self, req: &Request) -> Option<&'static str> {
        if !self.has_feature(Feature::METADATA) {
            return Some(METADATA_NOT_AVAILABLE);
        }
        if self.metadata_visibility != RequestAttributes::ANY
            && !RequestAttributes::from_request(req).contains(self.metadata_visibility)
        {
            return Some(METADATA_NOT_VISIBLE);
        }
        None
    }

    /// Like [`metadata_denial`](Self::metadata_denial), but logs and counts
    /// the denial.
    #[must_use]
    pub fn check_metadata_access(&self, req: &Request) -> Option<&'static str> {
        let reason = self.metadata_denial(req)?;
        warn!(
            request_id = %req.id(),
            path = req.path(),
            reason,
            "metadata access denied"
        );
        record_feature_denial(if reason == METADATA_NOT_AVAILABLE {
            "metadata_disabled"
        } else {
            "metadata_not_visible"
        });
        Some(reason)
    }

    /// Returns `true` if the request carries the configured admin secret,
    /// in the `authsecret` query parameter or the `x-auth-secret` header.
    ///
    /// Always `false` when no secret is configured.
    #[must_use]
    pub fn has_valid_auth_secret(&self, req: &Request) -> bool {
        let Some(expected) = self.admin_auth_secret.as_deref().filter(|s| !s.is_empty()) else {
            return false;
        };
        req.query_param(AUTH_SECRET_PARAM)
            .or_else(|| req.header(AUTH_SECRET_HEADER))
            .is_some_and(|provided| provided == expected)
    }

    /// Fails unless [`has_valid_auth_secret`](Self::has_valid_auth_secret).
    pub fn assert_admin_auth_secret(&self, req: &Request) -> HostResult<()> {
        if self.has_valid_auth_secret(req) {
            return Ok(());
        }
        warn!(request_id = %req.id(), "invalid or missing admin auth secret");
        record_feature_denial("admin_secret");
        Err(HostError::unauthorized("Invalid or missing auth secret"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn request(peer: &str) -> Request {
        Request::new(Method::GET, "/metadata".parse().unwrap())
            .with_remote_addr(peer.parse().unwrap())
    }

    #[test]
    fn test_all_sentinel_allows_everything() {
        let gate = FeatureGate::default();
        assert!(gate.has_feature(Feature::METADATA | Feature::SOAP));
        assert!(gate.assert_features(Feature::CSV).is_ok());
        assert!(gate.assert_content_type("application/x-yaml").is_ok());
    }

    #[test]
    fn test_assert_features_names_disabled_set() {
        let gate = FeatureGate::new(Feature::JSON);
        let err = gate.assert_features(Feature::JSON | Feature::XML).unwrap_err();
        assert!(matches!(err, HostError::Unauthorized { .. }));
        assert!(err.to_string().contains("'xml'"));
        assert!(!err.to_string().contains("json"));
    }

    #[test]
    fn test_assert_content_type_maps_to_feature() {
        let gate = FeatureGate::new(Feature::JSON | Feature::SOAP11);
        assert!(gate.assert_content_type("application/json; charset=utf-8").is_ok());
        assert!(gate.assert_content_type("text/xml").is_ok());
        assert!(gate.assert_content_type("application/soap+xml").is_err());
        assert!(gate.assert_content_type("text/csv").is_err());
    }

    #[test]
    fn test_metadata_denial_reasons() {
        let disabled = FeatureGate::new(Feature::JSON);
        assert_eq!(
            disabled.metadata_denial(&request("127.0.0.1:1")),
            Some(METADATA_NOT_AVAILABLE)
        );

        let local_only = FeatureGate::new(Feature::ALL)
            .with_metadata_visibility(RequestAttributes::LOCALHOST);
        assert_eq!(local_only.metadata_denial(&request("127.0.0.1:1")), None);
        assert_eq!(
            local_only.metadata_denial(&request("203.0.113.9:1")),
            Some(METADATA_NOT_VISIBLE)
        );

        let open = FeatureGate::new(Feature::METADATA);
        assert_eq!(open.metadata_denial(&request("203.0.113.9:1")), None);
    }

    #[test]
    fn test_check_metadata_access_matches_denial() {
        let gate = FeatureGate::new(Feature::METADATA)
            .with_metadata_visibility(RequestAttributes::INTERNAL_NETWORK_ACCESS);
        assert_eq!(gate.check_metadata_access(&request("127.0.0.1:1")), None);
        assert_eq!(
            gate.check_metadata_access(&request("198.51.100.2:1")),
            Some(METADATA_NOT_VISIBLE)
        );
    }

    #[test]
    fn test_auth_secret_sources() {
        let gate = FeatureGate::default().with_admin_auth_secret("s3cret");

        let by_query = Request::new(Method::GET, "/admin?authsecret=s3cret".parse().unwrap());
        assert!(gate.has_valid_auth_secret(&by_query));

        let by_header = Request::new(Method::GET, "/admin".parse().unwrap())
            .with_header("x-auth-secret", "s3cret");
        assert!(gate.assert_admin_auth_secret(&by_header).is_ok());

        let wrong = Request::new(Method::GET, "/admin?authsecret=guess".parse().unwrap());
        assert!(matches!(
            gate.assert_admin_auth_secret(&wrong),
            Err(HostError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_auth_secret_fails_closed_without_config() {
        let gate = FeatureGate::default();
        let req = Request::new(Method::GET, "/admin?authsecret=".parse().unwrap());
        assert!(!gate.has_valid_auth_secret(&req));

        let empty = FeatureGate::default().with_admin_auth_secret("");
        assert!(!empty.has_valid_auth_secret(&req));
    }
}
