//! Type-scoped filter descriptors.

use crate::filter::{RequestFilter, ResponseFilter};
use std::fmt;
use std::sync::Arc;

/// A filter bound to one DTO type, with an ordering priority.
///
/// Lower priorities run earlier. Negative priorities run before the global
/// filters, non-negative ones after them.
pub struct FilterAttribute<F: ?Sized> {
    priority: i32,
    filter: Arc<F>,
}

/// A type-scoped request filter.
pub type RequestFilterAttribute = FilterAttribute<dyn RequestFilter>;

/// A type-scoped response filter.
pub type ResponseFilterAttribute = FilterAttribute<dyn ResponseFilter>;

impl<F: ?Sized> FilterAttribute<F> {
    /// Creates an attribute from a shared filter.
    #[must_use]
    pub fn new(priority: i32, filter: Arc<F>) -> Self {
        Self { priority, filter }
    }

    /// Returns the priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the filter.
    #[must_use]
    pub fn filter(&self) -> &Arc<F> {
        &self.filter
    }

    /// Returns `true` if this attribute runs before the global filters.
    #[must_use]
    pub fn runs_before_globals(&self) -> bool {
        self.priority < 0
    }
}

impl<F: ?Sized> Clone for FilterAttribute<F> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<F: ?Sized> fmt::Debug for FilterAttribute<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterAttribute")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Counts the leading attributes that run before the global filters.
///
/// `attributes` must already be sorted by priority.
#[must_use]
pub fn global_partition<F: ?Sized>(attributes: &[FilterAttribute<F>]) -> usize {
    attributes
        .iter()
        .take_while(|attribute| attribute.runs_before_globals())
        .count()
}
