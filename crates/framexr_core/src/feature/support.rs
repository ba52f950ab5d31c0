//! Rendering settings plus shared instance/session handle tracking.
//!
//! # Responsibility
//! - Record the live instance and session handles and broadcast changes.
//! - Resolve arbitrary instance procs for code outside the facades.
//!
//! # Invariants
//! - Handle-event subscribers persist across sessions; they are only dropped
//!   by unsubscribing.
//! - Handles read as absent once their destroy callback ran.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::{Feature, SUPPORT_FEATURE_ID};
use crate::settings::{BuildTarget, SupportSettings};
use crate::xr::binding::ExtensionFunction;
use crate::xr::host::XrHost;
use crate::xr::observer::{Observers, SubscriptionId};
use crate::xr::resolver::FunctionResolver;
use log::{info, warn};
use openxr_sys as sys;

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        SUPPORT_FEATURE_ID,
        "Valve Utils: Settings for Unity's Rendering",
        "Settings for OpenXR Rendering.",
        "0.1.0",
        &[],
        &[BuildTarget::Android],
    )
}

/// Handle lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleEvent {
    InstanceCreated(sys::Instance),
    InstanceDestroyed(sys::Instance),
    SessionCreated(sys::Session),
    SessionDestroyed(sys::Session),
}

pub struct SupportFeature {
    settings: SupportSettings,
    instance: Option<sys::Instance>,
    session: Option<sys::Session>,
    resolver: FunctionResolver,
    events: Observers<HandleEvent>,
}

impl SupportFeature {
    pub fn new(settings: SupportSettings) -> Self {
        Self {
            settings,
            instance: None,
            session: None,
            resolver: FunctionResolver::default(),
            events: Observers::new(),
        }
    }

    pub fn settings(&self) -> &SupportSettings {
        &self.settings
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn instance(&self) -> Option<sys::Instance> {
        self.instance
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<sys::Session> {
        self.session
    }

    pub fn subscribe_handle_events(
        &mut self,
        callback: impl FnMut(&HandleEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe_handle_events(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Resolves `name` against the live instance.
    pub fn get_instance_proc(&self, name: &str) -> Option<sys::pfn::VoidFunction> {
        if !self.resolver.has_accessor() {
            warn!(
                "event=support_instance_proc module=feature status=error function={} reason=accessor_invalid",
                name
            );
            return None;
        }
        let instance = self.instance.unwrap_or(sys::Instance::from_raw(0));
        self.resolver.resolve(instance, name).ok()
    }

    /// Typed form of [`Self::get_instance_proc`].
    ///
    /// The pointer is not tied to an instance generation; callers must drop
    /// it when the instance is destroyed.
    pub fn get_instance_proc_typed<F: ExtensionFunction>(&self) -> Option<F::Pfn> {
        self.get_instance_proc(F::NAME)
            // SAFETY: the runtime returned `target` for `F::NAME`.
            .map(|target| unsafe { F::cast(target) })
    }
}

impl Feature for SupportFeature {
    fn id(&self) -> &'static str {
        SUPPORT_FEATURE_ID
    }

    fn on_instance_create(&mut self, host: &dyn XrHost, instance: sys::Instance) -> bool {
        self.instance = Some(instance);
        self.resolver = FunctionResolver::from_host(host);
        self.events.notify(&HandleEvent::InstanceCreated(instance));
        info!(
            "event=support_instance_create module=feature status=ok instance={}",
            instance.into_raw()
        );
        true
    }

    fn on_instance_destroy(&mut self, instance: sys::Instance) {
        self.events.notify(&HandleEvent::InstanceDestroyed(instance));
        self.instance = None;
    }

    fn on_session_create(&mut self, session: sys::Session) {
        self.session = Some(session);
        self.events.notify(&HandleEvent::SessionCreated(session));
    }

    fn on_session_destroy(&mut self, session: sys::Session) {
        self.events.notify(&HandleEvent::SessionDestroyed(session));
        self.session = None;
    }
}
