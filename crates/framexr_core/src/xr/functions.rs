//! Extension entry points used by the features, with their C signatures.

use openxr_sys as sys;
use std::ffi::c_void;

crate::extension_function!(
    /// `XR_FB_display_refresh_rate`: current display refresh rate.
    pub GetDisplayRefreshRateFB = "xrGetDisplayRefreshRateFB" => sys::pfn::GetDisplayRefreshRateFB
);

crate::extension_function!(
    /// `XR_FB_display_refresh_rate`: request a new display refresh rate.
    pub RequestDisplayRefreshRateFB = "xrRequestDisplayRefreshRateFB" => sys::pfn::RequestDisplayRefreshRateFB
);

crate::extension_function!(
    /// `XR_FB_display_refresh_rate`: two-call enumeration of supported rates.
    pub EnumerateDisplayRefreshRatesFB = "xrEnumerateDisplayRefreshRatesFB" => sys::pfn::EnumerateDisplayRefreshRatesFB
);

crate::extension_function!(
    /// Core: system properties for a system id.
    pub GetSystemProperties = "xrGetSystemProperties" => sys::pfn::GetSystemProperties
);

crate::extension_function!(
    /// `XR_META_foveation_eye_tracked`: current eye-tracked foveation centres.
    pub GetFoveationEyeTrackedStateMETA = "xrGetFoveationEyeTrackedStateMETA" => PfnGetFoveationEyeTrackedStateMETA
);

/// `XrStructureType` value for [`FoveationEyeTrackedStateMETA`].
pub const TYPE_FOVEATION_EYE_TRACKED_STATE_META: i32 = 1_000_200_001;

/// `XR_FOVEATION_EYE_TRACKED_STATE_VALID_BIT_META`.
pub const FOVEATION_EYE_TRACKED_STATE_VALID_BIT_META: u64 = 0x0000_0001;

/// `XrFoveationEyeTrackedStateMETA`, laid out as the C header declares it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FoveationEyeTrackedStateMETA {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub foveation_center: [sys::Vector2f; 2],
    pub flags: u64,
}

impl FoveationEyeTrackedStateMETA {
    /// Output structure ready to be filled by the runtime.
    pub fn out() -> Self {
        Self {
            ty: sys::StructureType::from_raw(TYPE_FOVEATION_EYE_TRACKED_STATE_META),
            next: std::ptr::null_mut(),
            foveation_center: [sys::Vector2f { x: 0.0, y: 0.0 }; 2],
            flags: 0,
        }
    }

    /// The sample counts only when the valid bit is the sole flag set.
    pub fn is_valid(&self) -> bool {
        self.flags == FOVEATION_EYE_TRACKED_STATE_VALID_BIT_META
    }
}

pub type PfnGetFoveationEyeTrackedStateMETA = unsafe extern "system" fn(
    session: sys::Session,
    foveation_state: *mut FoveationEyeTrackedStateMETA,
) -> sys::Result;
