//! Service container.
//!
//! The host registers its services once at startup. Filters reach them
//! through [`Request::try_resolve`](crate::Request::try_resolve), so every
//! dependency a filter uses is visible in its call signature instead of
//! being injected into the filter behind its back.
//!
//! # Example
//!
//! ```rust
//! use portico_core::Container;
//! use std::sync::Arc;
//!
//! struct SessionStore;
//!
//! let mut container = Container::new();
//! container.register(Arc::new(SessionStore));
//!
//! let store: Arc<SessionStore> = container.resolve().unwrap();
//! ```

use crate::error::{HostError, HostResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-keyed registry of `Arc`-wrapped services.
///
/// Frozen once the host starts serving; shared between exchanges behind an
/// `Arc<Container>`.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers a service, replacing any previous instance of the same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Resolves a service, returning `None` if it was never registered.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| s.clone().downcast::<T>().ok())
    }

    /// Resolves a service or fails with an internal error naming the type.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> HostResult<Arc<T>> {
        self.resolve().ok_or_else(|| {
            HostError::internal(format!(
                "service {} not registered",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Checks if a service is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Clock {
        offset: i64,
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        assert!(container.is_empty());
        container.register(Arc::new(Clock { offset: 5 }));

        let clock = container.resolve::<Clock>().expect("clock registered");
        assert_eq!(clock.offset, 5);
        assert!(container.contains::<Clock>());
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_resolve_required_missing_names_type() {
        let container = Container::new();
        let err = container.resolve_required::<Clock>().unwrap_err();
        assert!(err.to_string().contains("Clock"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_register_replaces() {
        let mut container = Container::new();
        container.register(Arc::new(Clock { offset: 1 }));
        container.register(Arc::new(Clock { offset: 2 }));
        assert_eq!(container.len(), 1);
        assert_eq!(container.resolve::<Clock>().unwrap().offset, 2);
    }

    #[test]
    fn test_debug_shows_count() {
        let container = Container::new();
        assert!(format!("{container:?}").contains("service_count"));
    }
}
