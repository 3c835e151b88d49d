//! Lifecycle hooks around type-scoped filter invocations.
//!
//! Every attribute filter invocation is bracketed by
//! [`FilterWiring::auto_wire`] and [`FilterWiring::release`]. The pipeline
//! holds a [`WiringGuard`] for the duration of the call, so `release` runs
//! exactly once whether the filter returns, fails, or its future is dropped.

use portico_core::Request;
use tracing::trace;

/// Identifies one attribute filter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterInfo {
    /// Filter name.
    pub name: &'static str,
    /// Attribute priority.
    pub priority: i32,
    /// Type name of the DTO the attribute is declared on.
    pub dto_type: &'static str,
}

/// Hooks run before and after each attribute filter.
///
/// Implementations must not panic; they run on the request path.
pub trait FilterWiring: Send + Sync + 'static {
    /// Called right before the filter runs.
    fn auto_wire(&self, info: &FilterInfo, req: &Request);

    /// Called once after the filter ran, failed, or was cancelled.
    fn release(&self, info: &FilterInfo);
}

/// Default wiring: filters resolve their services from the request's
/// container (`Request::try_resolve`), so there is nothing to inject and
/// the hooks only trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerWiring;

impl FilterWiring for ContainerWiring {
    fn auto_wire(&self, info: &FilterInfo, req: &Request) {
        trace!(
            filter = info.name,
            priority = info.priority,
            dto = info.dto_type,
            services = req.services().len(),
            "wiring filter"
        );
    }

    fn release(&self, info: &FilterInfo) {
        trace!(filter = info.name, "releasing filter");
    }
}

/// Scoped acquisition of a wired filter.
pub(crate) struct WiringGuard<'w> {
    wiring: &'w dyn FilterWiring,
    info: FilterInfo,
}

impl<'w> WiringGuard<'w> {
    pub(crate) fn acquire(wiring: &'w dyn FilterWiring, info: FilterInfo, req: &Request) -> Self {
        wiring.auto_wire(&info, req);
        Self { wiring, info }
    }
}

impl Drop for WiringGuard<'_> {
    fn drop(&mut self) {
        self.wiring.release(&self.info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl FilterWiring for Recorder {
        fn auto_wire(&self, info: &FilterInfo, _req: &Request) {
            self.events.lock().push(format!("wire:{}", info.name));
        }

        fn release(&self, info: &FilterInfo) {
            self.events.lock().push(format!("release:{}", info.name));
        }
    }

    fn info() -> FilterInfo {
        FilterInfo {
            name: "auth",
            priority: -1,
            dto_type: "CreateOrder",
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let recorder = Recorder::default();
        let req = Request::new(Method::GET, "/".parse().unwrap());
        {
            let _guard = WiringGuard::acquire(&recorder, info(), &req);
            assert_eq!(*recorder.events.lock(), ["wire:auth"]);
        }
        assert_eq!(*recorder.events.lock(), ["wire:auth", "release:auth"]);
    }

    #[test]
    fn test_guard_releases_on_early_return() {
        fn failing(recorder: &Recorder, req: &Request) -> Result<(), &'static str> {
            let _guard = WiringGuard::acquire(recorder, info(), req);
            Err("filter failed")
        }

        let recorder = Recorder::default();
        let req = Request::new(Method::GET, "/".parse().unwrap());
        assert!(failing(&recorder, &req).is_err());
        assert_eq!(recorder.events.lock().len(), 2);
    }

    #[test]
    fn test_container_wiring_is_silent() {
        let req = Request::new(Method::GET, "/".parse().unwrap());
        let _guard = WiringGuard::acquire(&ContainerWiring, info(), &req);
    }
}
