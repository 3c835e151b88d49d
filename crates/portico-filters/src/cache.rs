//! Per-type attribute lookup with process-lifetime memoisation.
//!
//! Declarations are collected while the host is configured and frozen into
//! an [`AttributeFilterCache`]. The first lookup for a DTO type sorts its
//! declarations by priority and publishes the result; every later lookup
//! returns the same shared slice.
//!
//! Publication uses `DashMap::entry(..).or_insert(..)`: two tasks that miss
//! at the same time may both sort, but only the first insert is kept and
//! both receive it.

use crate::attribute::{FilterAttribute, RequestFilterAttribute, ResponseFilterAttribute};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Declarations of type-scoped filters, keyed by DTO type.
#[derive(Default)]
pub(crate) struct AttributeDeclarations {
    pub(crate) request: HashMap<TypeId, Vec<RequestFilterAttribute>>,
    pub(crate) response: HashMap<TypeId, Vec<ResponseFilterAttribute>>,
}

/// Memoised, priority-sorted attribute lists.
pub struct AttributeFilterCache {
    declarations: AttributeDeclarations,
    request_memo: DashMap<TypeId, Arc<[RequestFilterAttribute]>>,
    response_memo: DashMap<TypeId, Arc<[ResponseFilterAttribute]>>,
}

impl AttributeFilterCache {
    pub(crate) fn new(declarations: AttributeDeclarations) -> Self {
        Self {
            declarations,
            request_memo: DashMap::new(),
            response_memo: DashMap::new(),
        }
    }

    /// Returns the request filters declared for a DTO type, sorted ascending
    /// by priority. Ties keep declaration order.
    pub fn request_filter_attributes(&self, dto_type: TypeId) -> Arc<[RequestFilterAttribute]> {
        lookup(&self.request_memo, &self.declarations.request, dto_type)
    }

    /// Returns the response filters declared for a DTO type, sorted ascending
    /// by priority. Ties keep declaration order.
    pub fn response_filter_attributes(&self, dto_type: TypeId) -> Arc<[ResponseFilterAttribute]> {
        lookup(&self.response_memo, &self.declarations.response, dto_type)
    }

    /// Number of DTO types with declared attributes.
    #[must_use]
    pub fn declared_types(&self) -> usize {
        self.declarations.request.len() + self.declarations.response.len()
    }

    /// Number of lookups published so far, across both sides.
    #[must_use]
    pub fn memoised_types(&self) -> usize {
        self.request_memo.len() + self.response_memo.len()
    }
}

impl std::fmt::Debug for AttributeFilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeFilterCache")
            .field("declared_types", &self.declared_types())
            .field("memoised_types", &self.memoised_types())
            .finish()
    }
}

fn lookup<F: ?Sized>(
    memo: &DashMap<TypeId, Arc<[FilterAttribute<F>]>>,
    declarations: &HashMap<TypeId, Vec<FilterAttribute<F>>>,
    dto_type: TypeId,
) -> Arc<[FilterAttribute<F>]> {
    if let Some(hit) = memo.get(&dto_type) {
        return Arc::clone(hit.value());
    }

    // Sorted outside the shard lock; a racing insert wins and ours is dropped.
    let mut sorted: Vec<FilterAttribute<F>> =
        declarations.get(&dto_type).cloned().unwrap_or_default();
    sorted.sort_by_key(FilterAttribute::priority);
    trace!(?dto_type, count = sorted.len(), "resolved filter attributes");

    let published = memo.entry(dto_type).or_insert_with(|| Arc::from(sorted));
    Arc::clone(published.value())
}
