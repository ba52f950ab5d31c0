//! Lifecycle state machine shared by extension-backed features.
//!
//! # Responsibility
//! - Track the instance and session handles a feature is bound to.
//! - Gate function resolution on the governing extension being enabled.
//! - Own the feature's binding cache and "available" subscribers.
//!
//! # Invariants
//! - Operations run only in `Initialized`; otherwise they fail with
//!   `XrCallError::NotInitialized` before any native call.
//! - Session end, session destroy and instance destroy drop every cached
//!   binding and every subscriber and return to `Uninitialized`.
//! - A new instance always gets a new generation, so bindings resolved under
//!   an older instance are rejected.
//! - Raw handle `0` is the null handle and is never recorded as bound.

use crate::xr::binding::{Binding, BindingCache, ExtensionFunction, InstanceGeneration};
use crate::xr::host::XrHost;
use crate::xr::observer::{Observers, SubscriptionId};
use crate::xr::resolver::FunctionResolver;
use crate::xr::result::{CallResult, XrCallError};
use crate::xr::session::LifecycleState;
use log::{error, info};
use openxr_sys as sys;

/// Event passed to "feature available" subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureAvailable {
    pub feature: &'static str,
    pub session: sys::Session,
}

/// Handles a feature holds while `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundHandles {
    pub instance: sys::Instance,
    pub session: sys::Session,
    pub generation: InstanceGeneration,
}

pub struct FacadeCore {
    feature: &'static str,
    extension: &'static str,
    state: LifecycleState,
    instance: Option<sys::Instance>,
    session: Option<sys::Session>,
    last_generation: Option<InstanceGeneration>,
    resolver: FunctionResolver,
    bindings: BindingCache,
    available: Observers<FeatureAvailable>,
}

impl FacadeCore {
    /// `feature` names the facade in logs; `extension` gates session begin.
    pub fn new(feature: &'static str, extension: &'static str) -> Self {
        Self {
            feature,
            extension,
            state: LifecycleState::Uninitialized,
            instance: None,
            session: None,
            last_generation: None,
            resolver: FunctionResolver::default(),
            bindings: BindingCache::new(),
            available: Observers::new(),
        }
    }

    pub fn feature(&self) -> &'static str {
        self.feature
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == LifecycleState::Initialized
    }

    pub fn instance(&self) -> Option<sys::Instance> {
        self.instance
    }

    pub fn session(&self) -> Option<sys::Session> {
        self.session
    }

    /// Generation of the live instance, `None` once it is destroyed.
    pub fn generation(&self) -> Option<InstanceGeneration> {
        self.bindings.generation()
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    /// Records a new instance and starts a fresh binding window.
    pub fn on_instance_create(&mut self, host: &dyn XrHost, instance: sys::Instance) {
        if instance.into_raw() == 0 {
            error!(
                "event=feature_instance_create module=feature status=error feature={} reason=null_instance",
                self.feature
            );
            self.on_instance_destroy(instance);
            return;
        }
        let generation = self
            .last_generation
            .map(InstanceGeneration::next)
            .unwrap_or_else(InstanceGeneration::first);
        self.last_generation = Some(generation);
        self.instance = Some(instance);
        self.session = None;
        self.resolver = FunctionResolver::from_host(host);
        self.bindings.bind_instance(instance, generation);
        self.state = LifecycleState::InstanceBound;
        info!(
            "event=feature_instance_create module=feature status=ok feature={} instance={} generation={}",
            self.feature,
            instance.into_raw(),
            generation.get()
        );
    }

    /// Binds `session` and runs `resolve` to obtain the feature's functions.
    ///
    /// Returns the resolved value on success; the facade is then
    /// `Initialized` and subscribers have been notified. Returns `None`
    /// when there is no instance, when the extension is not enabled, or
    /// when resolution fails.
    pub fn on_session_begin<R>(
        &mut self,
        host: &dyn XrHost,
        session: sys::Session,
        resolve: impl FnOnce(&mut BindingCache, &FunctionResolver) -> CallResult<R>,
    ) -> Option<R> {
        if self.instance.is_none() {
            error!(
                "event=feature_session_begin module=feature status=error feature={} reason=no_instance",
                self.feature
            );
            return None;
        }
        if session.into_raw() == 0 {
            error!(
                "event=feature_session_begin module=feature status=error feature={} reason=null_session",
                self.feature
            );
            return None;
        }
        if !host.is_extension_enabled(self.extension) {
            error!(
                "event=feature_session_begin module=feature status=error feature={} reason=extension_not_enabled extension={}",
                self.feature, self.extension
            );
            return None;
        }

        self.session = Some(session);
        self.state = LifecycleState::SessionBound;
        self.bindings.clear_targets();

        match resolve(&mut self.bindings, &self.resolver) {
            Ok(resolved) => {
                self.state = LifecycleState::Initialized;
                info!(
                    "event=feature_session_begin module=feature status=ok feature={} session={}",
                    self.feature,
                    session.into_raw()
                );
                let notified = self.available.notify(&FeatureAvailable {
                    feature: self.feature,
                    session,
                });
                if notified > 0 {
                    info!(
                        "event=feature_available module=feature status=ok feature={} subscribers={}",
                        self.feature, notified
                    );
                }
                Some(resolved)
            }
            Err(err) => {
                error!(
                    "event=feature_session_begin module=feature status=error feature={} reason=fatal_configuration error={}",
                    self.feature, err
                );
                None
            }
        }
    }

    /// Session end or destroy: drop bindings and subscribers, keep the
    /// instance so a later session can re-resolve.
    pub fn on_session_teardown(&mut self, session: sys::Session) {
        self.bindings.clear_targets();
        self.available.clear();
        self.session = None;
        self.state = LifecycleState::Uninitialized;
        info!(
            "event=feature_session_teardown module=feature status=ok feature={} session={}",
            self.feature,
            session.into_raw()
        );
    }

    /// Instance destroy: forget everything tied to the instance.
    pub fn on_instance_destroy(&mut self, instance: sys::Instance) {
        self.bindings.invalidate();
        self.available.clear();
        self.session = None;
        self.instance = None;
        self.state = LifecycleState::Uninitialized;
        info!(
            "event=feature_instance_destroy module=feature status=ok feature={} instance={}",
            self.feature,
            instance.into_raw()
        );
    }

    /// Returns the bound handles, or `NotInitialized` after logging why.
    pub fn require_initialized(&self) -> CallResult<BoundHandles> {
        match (self.state, self.instance, self.session, self.generation()) {
            (LifecycleState::Initialized, Some(instance), Some(session), Some(generation)) => {
                Ok(BoundHandles {
                    instance,
                    session,
                    generation,
                })
            }
            _ => {
                error!(
                    "event=feature_call module=feature status=error feature={} reason=not_initialized state={}",
                    self.feature, self.state
                );
                Err(XrCallError::NotInitialized(self.feature))
            }
        }
    }

    /// Resolves an optional entry point on demand while initialised.
    pub fn resolve_lazy<F: ExtensionFunction>(&mut self) -> CallResult<Binding<F>> {
        self.require_initialized()?;
        self.bindings.resolve::<F>(&self.resolver)
    }

    pub fn subscribe_available(
        &mut self,
        callback: impl FnMut(&FeatureAvailable) + Send + 'static,
    ) -> SubscriptionId {
        self.available.subscribe(callback)
    }

    pub fn unsubscribe_available(&mut self, id: SubscriptionId) -> bool {
        self.available.unsubscribe(id)
    }

    pub fn available_subscribers(&self) -> usize {
        self.available.len()
    }
}

#[cfg(test)]
mod tests {
    use super::FacadeCore;
    use crate::xr::host::StaticHost;
    use crate::xr::result::XrCallError;
    use crate::xr::session::LifecycleState;
    use openxr_sys as sys;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const EXTENSION: &str = "XR_TEST_extension";

    fn enabled_host() -> StaticHost {
        StaticHost::new(None).with_extensions([EXTENSION])
    }

    #[test]
    fn walks_through_lifecycle_states() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        assert_eq!(core.state(), LifecycleState::Uninitialized);

        core.on_instance_create(&host, sys::Instance::from_raw(3));
        assert_eq!(core.state(), LifecycleState::InstanceBound);

        let resolved = core.on_session_begin(&host, sys::Session::from_raw(4), |_, _| Ok(7));
        assert_eq!(resolved, Some(7));
        assert_eq!(core.state(), LifecycleState::Initialized);
        let handles = core.require_initialized().expect("initialized");
        assert_eq!(handles.session, sys::Session::from_raw(4));

        core.on_session_teardown(sys::Session::from_raw(4));
        assert_eq!(core.state(), LifecycleState::Uninitialized);
        assert_eq!(core.instance(), Some(sys::Instance::from_raw(3)));
        assert_eq!(
            core.require_initialized().unwrap_err(),
            XrCallError::NotInitialized("test")
        );
    }

    #[test]
    fn null_handles_are_never_bound() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        core.on_instance_create(&host, sys::Instance::from_raw(0));
        assert_eq!(core.state(), LifecycleState::Uninitialized);
        assert_eq!(core.instance(), None);

        core.on_instance_create(&host, sys::Instance::from_raw(3));
        let mut resolve_called = false;
        let resolved = core.on_session_begin(&host, sys::Session::from_raw(0), |_, _| {
            resolve_called = true;
            Ok(())
        });
        assert!(resolved.is_none());
        assert!(!resolve_called);
        assert_eq!(core.state(), LifecycleState::InstanceBound);
        assert_eq!(core.session(), None);
    }

    #[test]
    fn disabled_extension_stays_instance_bound() {
        let host = StaticHost::new(None);
        let mut core = FacadeCore::new("test", EXTENSION);
        core.on_instance_create(&host, sys::Instance::from_raw(3));
        let mut resolve_called = false;
        let resolved = core.on_session_begin(&host, sys::Session::from_raw(4), |_, _| {
            resolve_called = true;
            Ok(())
        });
        assert!(resolved.is_none());
        assert!(!resolve_called);
        assert_eq!(core.state(), LifecycleState::InstanceBound);
    }

    #[test]
    fn resolution_failure_stays_session_bound() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        core.on_instance_create(&host, sys::Instance::from_raw(3));
        let resolved: Option<()> = core.on_session_begin(&host, sys::Session::from_raw(4), |_, _| {
            Err(XrCallError::FunctionUnresolved("xrMissing"))
        });
        assert!(resolved.is_none());
        assert_eq!(core.state(), LifecycleState::SessionBound);
        assert!(core.require_initialized().is_err());
    }

    #[test]
    fn session_begin_without_instance_is_ignored() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        let resolved = core.on_session_begin(&host, sys::Session::from_raw(4), |_, _| Ok(()));
        assert!(resolved.is_none());
        assert_eq!(core.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn subscribers_fire_once_and_are_cleared_on_teardown() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        core.on_instance_create(&host, sys::Instance::from_raw(3));
        core.subscribe_available(move |event| {
            assert_eq!(event.feature, "test");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        core.on_session_begin(&host, sys::Session::from_raw(4), |_, _| Ok(()));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        core.on_session_teardown(sys::Session::from_raw(4));
        assert_eq!(core.available_subscribers(), 0);
        core.on_session_begin(&host, sys::Session::from_raw(5), |_, _| Ok(()));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_instance_gets_a_new_generation() {
        let host = enabled_host();
        let mut core = FacadeCore::new("test", EXTENSION);
        core.on_instance_create(&host, sys::Instance::from_raw(3));
        let first = core.generation().expect("generation");
        core.on_instance_destroy(sys::Instance::from_raw(3));
        assert_eq!(core.generation(), None);
        assert_eq!(core.instance(), None);

        core.on_instance_create(&host, sys::Instance::from_raw(3));
        let second = core.generation().expect("generation");
        assert!(second > first);
    }
}
