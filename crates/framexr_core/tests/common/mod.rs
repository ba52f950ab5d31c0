#![allow(dead_code)]

//! Mocked native OpenXR runtime shared by the integration tests.
//!
//! State is thread-local; every `#[test]` runs on its own thread.

use framexr_core::xr::functions::{FoveationEyeTrackedStateMETA, PfnGetFoveationEyeTrackedStateMETA};
use framexr_core::xr::sys;
use framexr_core::StaticHost;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ffi::{c_char, CStr};

pub const REFRESH_RATES: [f32; 3] = [72.0, 90.0, 120.0];
pub const EYE_CENTERS: [(f32, f32); 2] = [(-0.25, 0.1), (0.25, 0.1)];

thread_local! {
    static LOOKUPS: Cell<u32> = const { Cell::new(0) };
    static NATIVE_CALLS: Cell<u32> = const { Cell::new(0) };
    static MISSING: RefCell<BTreeSet<String>> = const { RefCell::new(BTreeSet::new()) };
    static CURRENT_RATE: Cell<f32> = const { Cell::new(90.0) };
    static REQUEST_RESULT: Cell<i32> = const { Cell::new(0) };
    static EYE_STATE_FLAGS: Cell<u64> = const { Cell::new(1) };
    static EYE_STATE_RESULT: Cell<i32> = const { Cell::new(0) };
    static SYSTEM_NAME: RefCell<String> = RefCell::new("SteamVR/OpenXR : cv".to_string());
}

pub fn lookups() -> u32 {
    LOOKUPS.with(Cell::get)
}

pub fn native_calls() -> u32 {
    NATIVE_CALLS.with(Cell::get)
}

pub fn current_rate() -> f32 {
    CURRENT_RATE.with(Cell::get)
}

/// Makes the proc-address lookup fail for `name`.
pub fn set_missing(name: &str) {
    MISSING.with(|missing| missing.borrow_mut().insert(name.to_string()));
}

pub fn set_request_result(result: sys::Result) {
    REQUEST_RESULT.with(|slot| slot.set(result.into_raw()));
}

pub fn set_eye_state(flags: u64, result: sys::Result) {
    EYE_STATE_FLAGS.with(|slot| slot.set(flags));
    EYE_STATE_RESULT.with(|slot| slot.set(result.into_raw()));
}

pub fn set_system_name(name: &str) {
    SYSTEM_NAME.with(|slot| *slot.borrow_mut() = name.to_string());
}

/// Host with the mocked loader and the given extensions enabled.
pub fn host(extensions: &[&str]) -> StaticHost {
    StaticHost::new(Some(mock_get_instance_proc_addr)).with_extensions(extensions.iter().copied())
}

fn count_native_call() {
    NATIVE_CALLS.with(|count| count.set(count.get() + 1));
}

unsafe extern "system" fn get_display_refresh_rate(
    _session: sys::Session,
    rate: *mut f32,
) -> sys::Result {
    count_native_call();
    *rate = CURRENT_RATE.with(Cell::get);
    sys::Result::SUCCESS
}

unsafe extern "system" fn request_display_refresh_rate(
    _session: sys::Session,
    rate: f32,
) -> sys::Result {
    count_native_call();
    let result = sys::Result::from_raw(REQUEST_RESULT.with(Cell::get));
    if result.into_raw() >= 0 {
        CURRENT_RATE.with(|slot| slot.set(rate));
    }
    result
}

unsafe extern "system" fn enumerate_display_refresh_rates(
    _session: sys::Session,
    capacity: u32,
    count: *mut u32,
    rates: *mut f32,
) -> sys::Result {
    count_native_call();
    *count = REFRESH_RATES.len() as u32;
    if capacity == 0 {
        return sys::Result::SUCCESS;
    }
    if (capacity as usize) < REFRESH_RATES.len() {
        return sys::Result::ERROR_SIZE_INSUFFICIENT;
    }
    for (index, rate) in REFRESH_RATES.iter().enumerate() {
        *rates.add(index) = *rate;
    }
    sys::Result::SUCCESS
}

unsafe extern "system" fn get_system_properties(
    _instance: sys::Instance,
    _system: sys::SystemId,
    properties: *mut sys::SystemProperties,
) -> sys::Result {
    count_native_call();
    let name = SYSTEM_NAME.with(|slot| slot.borrow().clone());
    let slots = &mut (*properties).system_name;
    slots.fill(0);
    let limit = slots.len() - 1;
    for (slot, byte) in slots.iter_mut().zip(name.bytes()).take(limit) {
        *slot = byte as c_char;
    }
    sys::Result::SUCCESS
}

unsafe extern "system" fn get_foveation_eye_tracked_state(
    _session: sys::Session,
    state: *mut FoveationEyeTrackedStateMETA,
) -> sys::Result {
    count_native_call();
    let state = &mut *state;
    for (center, (x, y)) in state.foveation_center.iter_mut().zip(EYE_CENTERS) {
        *center = sys::Vector2f { x, y };
    }
    state.flags = EYE_STATE_FLAGS.with(Cell::get);
    sys::Result::from_raw(EYE_STATE_RESULT.with(Cell::get))
}

unsafe extern "system" fn mock_get_instance_proc_addr(
    _instance: sys::Instance,
    name: *const c_char,
    function: *mut Option<sys::pfn::VoidFunction>,
) -> sys::Result {
    LOOKUPS.with(|count| count.set(count.get() + 1));
    let name = CStr::from_ptr(name).to_string_lossy().into_owned();
    *function = None;
    if MISSING.with(|missing| missing.borrow().contains(&name)) {
        return sys::Result::ERROR_FUNCTION_UNSUPPORTED;
    }

    use std::mem::transmute;
    use sys::pfn::VoidFunction;
    let target = match name.as_str() {
        "xrGetDisplayRefreshRateFB" => transmute::<sys::pfn::GetDisplayRefreshRateFB, VoidFunction>(
            get_display_refresh_rate as sys::pfn::GetDisplayRefreshRateFB,
        ),
        "xrRequestDisplayRefreshRateFB" => {
            transmute::<sys::pfn::RequestDisplayRefreshRateFB, VoidFunction>(
                request_display_refresh_rate as sys::pfn::RequestDisplayRefreshRateFB,
            )
        }
        "xrEnumerateDisplayRefreshRatesFB" => {
            transmute::<sys::pfn::EnumerateDisplayRefreshRatesFB, VoidFunction>(
                enumerate_display_refresh_rates as sys::pfn::EnumerateDisplayRefreshRatesFB,
            )
        }
        "xrGetSystemProperties" => transmute::<sys::pfn::GetSystemProperties, VoidFunction>(
            get_system_properties as sys::pfn::GetSystemProperties,
        ),
        "xrGetFoveationEyeTrackedStateMETA" => {
            transmute::<PfnGetFoveationEyeTrackedStateMETA, VoidFunction>(
                get_foveation_eye_tracked_state as PfnGetFoveationEyeTrackedStateMETA,
            )
        }
        _ => return sys::Result::ERROR_FUNCTION_UNSUPPORTED,
    };
    *function = Some(target);
    sys::Result::SUCCESS
}
