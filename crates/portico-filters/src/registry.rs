//! Globally registered filters and type-scoped declarations.
//!
//! A [`FilterRegistry`] is assembled once through [`FilterRegistryBuilder`]
//! while the host starts. After [`FilterRegistryBuilder::build`] nothing in
//! it can be mutated except the attribute memo, so request processing reads
//! it without locks.

use crate::attribute::FilterAttribute;
use crate::cache::{AttributeDeclarations, AttributeFilterCache};
use crate::filter::{PreRequestFilter, RequestFilter, ResponseFilter};
use portico_core::Dto;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A shared pre-request filter.
pub type BoxedPreRequestFilter = Arc<dyn PreRequestFilter>;
/// A shared request filter.
pub type BoxedRequestFilter = Arc<dyn RequestFilter>;
/// A shared response filter.
pub type BoxedResponseFilter = Arc<dyn ResponseFilter>;

/// Process-wide filter registrations.
///
/// Global lists run in registration order. Typed global filters run right
/// after the untyped ones, still inside the global tier, and only for their
/// DTO type.
pub struct FilterRegistry {
    pre_request: Vec<BoxedPreRequestFilter>,
    request: Vec<BoxedRequestFilter>,
    response: Vec<BoxedResponseFilter>,
    typed_request: HashMap<TypeId, Vec<BoxedRequestFilter>>,
    typed_response: HashMap<TypeId, Vec<BoxedResponseFilter>>,
    attributes: AttributeFilterCache,
}

impl FilterRegistry {
    /// Creates a new registry builder.
    #[must_use]
    pub fn builder() -> FilterRegistryBuilder {
        FilterRegistryBuilder::new()
    }

    /// Creates a registry with no filters at all.
    #[must_use]
    pub fn empty() -> Self {
        FilterRegistryBuilder::new().build()
    }

    /// Global pre-request filters in registration order.
    #[must_use]
    pub fn pre_request_filters(&self) -> &[BoxedPreRequestFilter] {
        &self.pre_request
    }

    /// Global request filters in registration order.
    #[must_use]
    pub fn request_filters(&self) -> &[BoxedRequestFilter] {
        &self.request
    }

    /// Global response filters in registration order.
    #[must_use]
    pub fn response_filters(&self) -> &[BoxedResponseFilter] {
        &self.response
    }

    /// Typed global request filters for a DTO type.
    #[must_use]
    pub fn typed_request_filters(&self, dto_type: TypeId) -> &[BoxedRequestFilter] {
        self.typed_request.get(&dto_type).map(Vec::as_slice).unwrap_or_default()
    }

    /// Typed global response filters for a DTO type.
    #[must_use]
    pub fn typed_response_filters(&self, dto_type: TypeId) -> &[BoxedResponseFilter] {
        self.typed_response.get(&dto_type).map(Vec::as_slice).unwrap_or_default()
    }

    /// The type-scoped attribute cache.
    #[must_use]
    pub fn attributes(&self) -> &AttributeFilterCache {
        &self.attributes
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pre_request: Vec<_> = self.pre_request.iter().map(|filter| filter.name()).collect();
        let request: Vec<_> = self.request.iter().map(|filter| filter.name()).collect();
        let response: Vec<_> = self.response.iter().map(|filter| filter.name()).collect();

        f.debug_struct("FilterRegistry")
            .field("pre_request", &pre_request)
            .field("request", &request)
            .field("response", &response)
            .field("typed_request_types", &self.typed_request.len())
            .field("typed_response_types", &self.typed_response.len())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Builder for a [`FilterRegistry`].
///
/// # Example
///
/// ```
/// use portico_filters::{FilterRegistry, FnPreRequestFilter, FnRequestFilter};
///
/// struct CreateOrder;
///
/// let registry = FilterRegistry::builder()
///     .pre_request_filter(FnPreRequestFilter::new("cors", |_req, _res| Ok(())))
///     .request_filter(FnRequestFilter::new("audit", |_req, _res, _dto| Ok(())))
///     .request_attribute::<CreateOrder>(-10, FnRequestFilter::new("auth", |_req, _res, _dto| Ok(())))
///     .build();
///
/// assert_eq!(registry.pre_request_filters().len(), 1);
/// assert_eq!(registry.request_filters()[0].name(), "audit");
/// ```
#[derive(Default)]
pub struct FilterRegistryBuilder {
    pre_request: Vec<BoxedPreRequestFilter>,
    request: Vec<BoxedRequestFilter>,
    response: Vec<BoxedResponseFilter>,
    typed_request: HashMap<TypeId, Vec<BoxedRequestFilter>>,
    typed_response: HashMap<TypeId, Vec<BoxedResponseFilter>>,
    declarations: AttributeDeclarations,
}

impl FilterRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a global pre-request filter.
    #[must_use]
    pub fn pre_request_filter(mut self, filter: impl PreRequestFilter) -> Self {
        self.pre_request.push(Arc::new(filter));
        self
    }

    /// Appends a global request filter.
    #[must_use]
    pub fn request_filter(mut self, filter: impl RequestFilter) -> Self {
        self.request.push(Arc::new(filter));
        self
    }

    /// Appends a global response filter.
    #[must_use]
    pub fn response_filter(mut self, filter: impl ResponseFilter) -> Self {
        self.response.push(Arc::new(filter));
        self
    }

    /// Appends a global request filter that only runs for DTOs of type `T`.
    #[must_use]
    pub fn typed_request_filter<T: Dto>(mut self, filter: impl RequestFilter) -> Self {
        self.typed_request
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Arc::new(filter));
        self
    }

    /// Appends a global response filter that only runs for DTOs of type `T`.
    #[must_use]
    pub fn typed_response_filter<T: Dto>(mut self, filter: impl ResponseFilter) -> Self {
        self.typed_response
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Arc::new(filter));
        self
    }

    /// Declares a request filter on the request DTO type `T`.
    #[must_use]
    pub fn request_attribute<T: Dto>(self, priority: i32, filter: impl RequestFilter) -> Self {
        self.request_attribute_shared::<T>(priority, Arc::new(filter))
    }

    /// Declares an already shared request filter on the request DTO type `T`.
    #[must_use]
    pub fn request_attribute_shared<T: Dto>(
        mut self,
        priority: i32,
        filter: BoxedRequestFilter,
    ) -> Self {
        self.declarations
            .request
            .entry(TypeId::of::<T>())
            .or_default()
            .push(FilterAttribute::new(priority, filter));
        self
    }

    /// Declares a response filter on the response DTO type `T`.
    #[must_use]
    pub fn response_attribute<T: Dto>(self, priority: i32, filter: impl ResponseFilter) -> Self {
        self.response_attribute_shared::<T>(priority, Arc::new(filter))
    }

    /// Declares an already shared response filter on the response DTO type `T`.
    #[must_use]
    pub fn response_attribute_shared<T: Dto>(
        mut self,
        priority: i32,
        filter: BoxedResponseFilter,
    ) -> Self {
        self.declarations
            .response
            .entry(TypeId::of::<T>())
            .or_default()
            .push(FilterAttribute::new(priority, filter));
        self
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> FilterRegistry {
        FilterRegistry {
            pre_request: self.pre_request,
            request: self.request,
            response: self.response,
            typed_request: self.typed_request,
            typed_response: self.typed_response,
            attributes: AttributeFilterCache::new(self.declarations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FnPreRequestFilter, FnRequestFilter, FnResponseFilter};

    struct GetUser;
    struct GetUserResponse;

    #[test]
    fn test_global_lists_keep_registration_order() {
        let registry = FilterRegistry::builder()
            .request_filter(FnRequestFilter::new("one", |_req, _res, _dto| Ok(())))
            .request_filter(FnRequestFilter::new("two", |_req, _res, _dto| Ok(())))
            .request_filter(FnRequestFilter::new("three", |_req, _res, _dto| Ok(())))
            .build();

        let names: Vec<_> = registry.request_filters().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["one", "two", "three"]);
    }

    #[test]
    fn test_typed_filters_are_keyed_by_type() {
        let registry = FilterRegistry::builder()
            .typed_request_filter::<GetUser>(FnRequestFilter::new("typed", |_req, _res, _dto| {
                Ok(())
            }))
            .typed_response_filter::<GetUserResponse>(FnResponseFilter::new(
                "typed_res",
                |_req, _res, _out| Ok(()),
            ))
            .build();

        assert_eq!(registry.typed_request_filters(TypeId::of::<GetUser>()).len(), 1);
        assert!(registry
            .typed_request_filters(TypeId::of::<GetUserResponse>())
            .is_empty());
        assert_eq!(
            registry.typed_response_filters(TypeId::of::<GetUserResponse>())[0].name(),
            "typed_res"
        );
    }

    #[test]
    fn test_attributes_reach_cache() {
        let shared: BoxedRequestFilter =
            Arc::new(FnRequestFilter::new("shared", |_req, _res, _dto| Ok(())));
        let registry = FilterRegistry::builder()
            .request_attribute::<GetUser>(3, FnRequestFilter::new("late", |_req, _res, _dto| Ok(())))
            .request_attribute_shared::<GetUser>(-1, Arc::clone(&shared))
            .build();

        let attrs = registry
            .attributes()
            .request_filter_attributes(TypeId::of::<GetUser>());
        assert_eq!(attrs.len(), 2);
        assert!(Arc::ptr_eq(attrs[0].filter(), &shared));
        assert_eq!(attrs[1].filter().name(), "late");
    }

    #[test]
    fn test_empty_registry() {
        let registry = FilterRegistry::default();
        assert!(registry.pre_request_filters().is_empty());
        assert!(registry.request_filters().is_empty());
        assert!(registry.response_filters().is_empty());
        assert_eq!(registry.attributes().declared_types(), 0);
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = FilterRegistry::builder()
            .pre_request_filter(FnPreRequestFilter::new("cors", |_req, _res| Ok(())))
            .build();
        assert!(format!("{registry:?}").contains("cors"));
    }
}
