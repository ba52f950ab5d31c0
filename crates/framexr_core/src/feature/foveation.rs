//! Foveated rendering controls.
//!
//! # Responsibility
//! - Map the normalised foveation level onto the display's discrete levels.
//! - Toggle eye-tracked foveation and read the eye-tracked foveation centres.
//! - Apply the configured initial settings when the session gains focus.
//!
//! # Invariants
//! - `> 0.75` is High, `> 0.25` Medium, `> 0.0001` Low, anything else Off.
//! - Reading back maps High and HighTop to 1.0, Medium to 0.75, Low to 0.25.
//! - Setting a level keeps the display's current dynamic flag and uses a
//!   vertical offset of 0.
//! - `xrGetFoveationEyeTrackedStateMETA` is resolved on first use only.
//! - The level and eye-tracked setters need only a session and a display.
//!   They skip the facade lifecycle gate, so they work without the META
//!   extension.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::extension::{
    XR_FB_FOVEATION, XR_FB_FOVEATION_CONFIGURATION, XR_FB_FOVEATION_VULKAN,
    XR_FB_SWAPCHAIN_UPDATE_STATE, XR_META_FOVEATION_EYE_TRACKED,
    XR_META_VULKAN_SWAPCHAIN_CREATE_INFO,
};
use crate::feature::facade::FacadeCore;
use crate::feature::{Feature, FOVEATED_RENDERING_FEATURE_ID};
use crate::settings::{BuildTarget, FoveationSettings};
use crate::xr::binding::ExtensionFunction;
use crate::xr::functions::{FoveationEyeTrackedStateMETA, GetFoveationEyeTrackedStateMETA};
use crate::xr::host::XrHost;
use crate::xr::result::{check, is_unqualified_success, CallResult, XrCallError};
use crate::xr::session::SessionState;
use log::{debug, info, warn};
use openxr_sys as sys;

pub const FOVEATION_EXTENSIONS: &[&str] = &[
    XR_FB_FOVEATION,
    XR_FB_FOVEATION_CONFIGURATION,
    XR_FB_FOVEATION_VULKAN,
    XR_FB_SWAPCHAIN_UPDATE_STATE,
    XR_META_FOVEATION_EYE_TRACKED,
    XR_META_VULKAN_SWAPCHAIN_CREATE_INFO,
];

const FEATURE_NAME: &str = "foveated_rendering";

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        FOVEATED_RENDERING_FEATURE_ID,
        "Valve Utils: Settings for Unity's Foveated Rendering",
        "Feature extension showing how to work with OpenXR foveated rendering.",
        "0.1.0",
        FOVEATION_EXTENSIONS,
        &[BuildTarget::Android],
    )
}

/// Discrete foveation levels understood by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FoveationLevel {
    Off,
    Low,
    Medium,
    High,
    HighTop,
}

impl FoveationLevel {
    /// Buckets a normalised level in `[0, 1]`.
    pub fn from_normalized(value: f32) -> Self {
        if value > 0.75 {
            Self::High
        } else if value > 0.25 {
            Self::Medium
        } else if value > 0.0001 {
            Self::Low
        } else {
            Self::Off
        }
    }

    pub fn to_normalized(self) -> f32 {
        match self {
            Self::High | Self::HighTop => 1.0,
            Self::Medium => 0.75,
            Self::Low => 0.25,
            Self::Off => 0.0,
        }
    }

    /// Unknown raw values read as `Off`.
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            4 => Self::HighTop,
            _ => Self::Off,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::HighTop => 4,
        }
    }
}

/// Foveation controls of the host's XR display subsystem.
pub trait FoveationDisplay: Send {
    fn set_foveation_level(
        &mut self,
        session: sys::Session,
        level: FoveationLevel,
        vertical_offset: f32,
        dynamic: bool,
    );

    fn foveation_level(&self) -> FoveationLevel;

    fn foveation_dynamic(&self) -> bool;

    fn set_eye_tracked(&mut self, session: sys::Session, eye_tracked: bool);

    fn eye_tracked(&self) -> bool;
}

pub struct FoveationFeature {
    settings: FoveationSettings,
    display: Option<Box<dyn FoveationDisplay>>,
    session: Option<sys::Session>,
    core: FacadeCore,
}

impl FoveationFeature {
    pub fn new(settings: FoveationSettings) -> Self {
        Self {
            settings,
            display: None,
            session: None,
            core: FacadeCore::new(FEATURE_NAME, XR_META_FOVEATION_EYE_TRACKED),
        }
    }

    pub fn with_display(mut self, display: Box<dyn FoveationDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn set_display(&mut self, display: Option<Box<dyn FoveationDisplay>>) {
        self.display = display;
    }

    pub fn settings(&self) -> &FoveationSettings {
        &self.settings
    }

    pub fn core(&self) -> &FacadeCore {
        &self.core
    }

    /// Normalised level read back from the display; 0 without a display.
    pub fn foveation_level(&self) -> f32 {
        self.display
            .as_ref()
            .map(|display| display.foveation_level().to_normalized())
            .unwrap_or(0.0)
    }

    /// Sets the level and returns the discrete level applied.
    pub fn set_foveation_level(&mut self, value: f32) -> CallResult<FoveationLevel> {
        let level = FoveationLevel::from_normalized(value);
        let session = self.require_session()?;
        let display = self.require_display()?;
        let dynamic = display.foveation_dynamic();
        display.set_foveation_level(session, level, 0.0, dynamic);
        debug!(
            "event=foveation_set_level module=feature status=ok value={} level={} dynamic={}",
            value,
            level.as_raw(),
            dynamic
        );
        Ok(level)
    }

    pub fn eye_tracked_foveation(&self) -> bool {
        self.display
            .as_ref()
            .map(|display| display.eye_tracked())
            .unwrap_or(false)
    }

    pub fn set_eye_tracked_foveation(&mut self, eye_tracked: bool) -> CallResult<()> {
        let session = self.require_session()?;
        self.require_display()?.set_eye_tracked(session, eye_tracked);
        debug!(
            "event=foveation_set_eye_tracked module=feature status=ok eye_tracked={}",
            eye_tracked
        );
        Ok(())
    }

    /// Current eye-tracked foveation centres, left eye first.
    ///
    /// `Ok(None)` when the runtime reports no valid gaze sample.
    pub fn eye_tracked_center(&mut self) -> CallResult<Option<[sys::Vector2f; 2]>> {
        let binding = self.core.resolve_lazy::<GetFoveationEyeTrackedStateMETA>()?;
        let handles = self.core.require_initialized()?;
        let get_state = binding.get(Some(handles.generation))?;

        let mut state = FoveationEyeTrackedStateMETA::out();
        // SAFETY: `get_state` was resolved for the live instance and `state`
        // is a correctly typed output structure.
        let result = unsafe { get_state(handles.session, &mut state) };
        let result = check(GetFoveationEyeTrackedStateMETA::NAME, result)?;
        if !is_unqualified_success(result) || !state.is_valid() {
            return Ok(None);
        }
        Ok(Some(state.foveation_center))
    }

    /// Applies the configured initial level and eye tracking.
    pub fn apply_initial_settings(&mut self) -> CallResult<()> {
        let level = self.set_foveation_level(self.settings.initial_foveation_level)?;
        self.set_eye_tracked_foveation(self.settings.initial_use_eye_tracking)?;
        info!(
            "event=foveation_apply_initial module=feature status=ok level={} eye_tracked={}",
            level.as_raw(),
            self.settings.initial_use_eye_tracking
        );
        Ok(())
    }

    fn require_session(&self) -> CallResult<sys::Session> {
        self.session.ok_or_else(|| {
            warn!("event=foveation_call module=feature status=error reason=no_session");
            XrCallError::NotInitialized(FEATURE_NAME)
        })
    }

    fn require_display(&mut self) -> CallResult<&mut Box<dyn FoveationDisplay>> {
        self.display.as_mut().ok_or_else(|| {
            warn!("event=foveation_call module=feature status=error reason=no_display");
            XrCallError::NotInitialized(FEATURE_NAME)
        })
    }
}

impl Feature for FoveationFeature {
    fn id(&self) -> &'static str {
        FOVEATED_RENDERING_FEATURE_ID
    }

    fn on_instance_create(&mut self, host: &dyn XrHost, instance: sys::Instance) -> bool {
        self.core.on_instance_create(host, instance);
        true
    }

    fn on_instance_destroy(&mut self, instance: sys::Instance) {
        self.session = None;
        self.core.on_instance_destroy(instance);
    }

    fn on_session_create(&mut self, session: sys::Session) {
        self.session = Some(session);
    }

    fn on_session_begin(&mut self, host: &dyn XrHost, session: sys::Session) {
        // Gaze state is optional and resolved on first query.
        let _ = self.core.on_session_begin(host, session, |_, _| Ok(()));
    }

    fn on_session_state_change(&mut self, old: SessionState, new: SessionState) {
        if old != SessionState::Visible || new != SessionState::Focused {
            return;
        }
        if !self.settings.apply_settings_on_startup {
            return;
        }
        if let Err(err) = self.apply_initial_settings() {
            warn!(
                "event=foveation_apply_initial module=feature status=error error={}",
                err
            );
        }
    }

    fn on_session_end(&mut self, session: sys::Session) {
        self.core.on_session_teardown(session);
    }

    fn on_session_destroy(&mut self, session: sys::Session) {
        self.session = None;
        self.core.on_session_teardown(session);
    }
}
