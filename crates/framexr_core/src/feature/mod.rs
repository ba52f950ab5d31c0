//! Host-facing OpenXR features.
//!
//! # Responsibility
//! - Declare each feature (id, extensions, build targets) for the registry.
//! - Receive the host's lifecycle callbacks through [`Feature`].
//!
//! # Invariants
//! - Features never own OpenXR handles; the host creates and destroys them.
//! - Callbacks arrive on the host's single XR thread, in lifecycle order.
//!
//! # See also
//! - `crate::runtime` for the dispatcher that fans callbacks out.

pub mod descriptor;
pub mod device_validation;
pub mod extension;
pub mod facade;
pub mod foveation;
pub mod refresh_rate;
pub mod registry;
pub mod render_regions;
pub mod support;
pub mod system_info;

use crate::xr::host::XrHost;
use crate::xr::session::SessionState;
use openxr_sys as sys;

pub const SUPPORT_FEATURE_ID: &str = "com.valvesoftware.openxr.utils.support";
pub const FOVEATED_RENDERING_FEATURE_ID: &str = "com.valvesoftware.openxr.utils.foveated_rendering";
pub const RENDER_REGIONS_FEATURE_ID: &str = "com.valvesoftware.openxr.utils.render_regions";
pub const DEVICE_VALIDATION_FEATURE_ID: &str = "com.valvesoftware.openxr.utils.validation";
pub const REFRESH_RATE_FEATURE_ID: &str = "com.valve.openxr.refreshrate";
pub const SYSTEM_INFO_FEATURE_ID: &str = "com.valvesoftware.openxr.utils.sysinfo";
pub const CONTROLLER_PROFILE_FEATURE_ID: &str = "com.unity.openxr.feature.input.frame_controller";

/// Lifecycle callbacks the host delivers to an enabled feature.
///
/// Every hook has a no-op default so features only implement what they use.
pub trait Feature: Send {
    fn id(&self) -> &'static str;

    /// Returning `false` asks the host to fail instance creation.
    fn on_instance_create(&mut self, _host: &dyn XrHost, _instance: sys::Instance) -> bool {
        true
    }

    fn on_instance_destroy(&mut self, _instance: sys::Instance) {}

    fn on_system_change(&mut self, _system: sys::SystemId) {}

    fn on_session_create(&mut self, _session: sys::Session) {}

    fn on_session_begin(&mut self, _host: &dyn XrHost, _session: sys::Session) {}

    fn on_session_state_change(&mut self, _old: SessionState, _new: SessionState) {}

    fn on_session_end(&mut self, _session: sys::Session) {}

    fn on_session_destroy(&mut self, _session: sys::Session) {}
}
