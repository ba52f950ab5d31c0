//! C entry points for the host engine plugin.
//!
//! # Responsibility
//! - Forward the host's OpenXR lifecycle callbacks to the process-wide
//!   [`FrameXrRuntime`].
//! - Expose the app-facing feature getters and setters with C types.
//!
//! # Invariants
//! - Exported functions never unwind across the boundary; panics are caught,
//!   logged and turned into the call's failure value.
//! - Failures return `-1` (`-1.0` for floats) unless a runtime result code is
//!   available, in which case that code is returned unchanged.
//! - "Feature available" callbacks run after the runtime lock is released.
//!
//! # String buffers
//! Functions filling a caller buffer return the size the value needs,
//! including the trailing NUL. The buffer is written only when `capacity` is
//! at least that size.

use framexr_core::feature::facade::FeatureAvailable;
use framexr_core::xr::observer::SubscriptionId;
use framexr_core::xr::result::{SENTINEL_FAILURE, SENTINEL_FAILURE_F32};
use framexr_core::{
    core_version, init_logging, FoveationDisplay, FoveationLevel, FrameXrRuntime,
    ProjectSettings, SessionState, StaticHost,
};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use openxr_sys as sys;
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

static RUNTIME: Lazy<Mutex<Option<FrameXrRuntime>>> = Lazy::new(|| Mutex::new(None));
static LAST_ERROR: Lazy<Mutex<String>> = Lazy::new(|| Mutex::new(String::new()));
static PENDING_AVAILABLE: Lazy<Mutex<Vec<FeatureAvailable>>> = Lazy::new(|| Mutex::new(Vec::new()));
static AVAILABLE_CALLBACK: Lazy<Mutex<Option<AvailableCallback>>> = Lazy::new(|| Mutex::new(None));
static AVAILABLE_SUBSCRIPTION: Lazy<Mutex<Option<SubscriptionId>>> = Lazy::new(|| Mutex::new(None));
static VERSION: Lazy<CString> = Lazy::new(|| CString::new(core_version()).unwrap_or_default());

/// Host callback told when the refresh-rate feature becomes usable.
pub type RefreshRateAvailableFn = unsafe extern "C" fn(user_data: *mut c_void, session: u64);

#[derive(Clone, Copy)]
struct AvailableCallback {
    function: RefreshRateAvailableFn,
    user_data: *mut c_void,
}

// SAFETY: `user_data` is opaque to this crate and only handed back to the
// host's own callback.
unsafe impl Send for AvailableCallback {}

/// Display subsystem callbacks the host registers for foveated rendering.
///
/// Missing entries make the matching operation a no-op (setters) or report
/// off / `false` (getters).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FoveationCallbacks {
    pub user_data: *mut c_void,
    pub set_foveation_level: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            session: u64,
            level: u32,
            vertical_offset: f32,
            dynamic: bool,
        ),
    >,
    pub foveation_level: Option<unsafe extern "C" fn(user_data: *mut c_void) -> u32>,
    pub foveation_dynamic: Option<unsafe extern "C" fn(user_data: *mut c_void) -> bool>,
    pub set_eye_tracked:
        Option<unsafe extern "C" fn(user_data: *mut c_void, session: u64, eye_tracked: bool)>,
    pub eye_tracked: Option<unsafe extern "C" fn(user_data: *mut c_void) -> bool>,
}

struct CallbackDisplay {
    callbacks: FoveationCallbacks,
}

// SAFETY: the host drives every callback from its single OpenXR callback
// thread; `user_data` is only passed back to the host's own functions.
unsafe impl Send for CallbackDisplay {}

impl FoveationDisplay for CallbackDisplay {
    fn set_foveation_level(
        &mut self,
        session: sys::Session,
        level: FoveationLevel,
        vertical_offset: f32,
        dynamic: bool,
    ) {
        if let Some(set) = self.callbacks.set_foveation_level {
            // SAFETY: registered by the host together with `user_data`.
            unsafe {
                set(
                    self.callbacks.user_data,
                    session.into_raw(),
                    level.as_raw(),
                    vertical_offset,
                    dynamic,
                )
            };
        }
    }

    fn foveation_level(&self) -> FoveationLevel {
        match self.callbacks.foveation_level {
            // SAFETY: registered by the host together with `user_data`.
            Some(get) => FoveationLevel::from_raw(unsafe { get(self.callbacks.user_data) }),
            None => FoveationLevel::Off,
        }
    }

    fn foveation_dynamic(&self) -> bool {
        match self.callbacks.foveation_dynamic {
            // SAFETY: registered by the host together with `user_data`.
            Some(get) => unsafe { get(self.callbacks.user_data) },
            None => false,
        }
    }

    fn set_eye_tracked(&mut self, session: sys::Session, eye_tracked: bool) {
        if let Some(set) = self.callbacks.set_eye_tracked {
            // SAFETY: registered by the host together with `user_data`.
            unsafe { set(self.callbacks.user_data, session.into_raw(), eye_tracked) };
        }
    }

    fn eye_tracked(&self) -> bool {
        match self.callbacks.eye_tracked {
            // SAFETY: registered by the host together with `user_data`.
            Some(get) => unsafe { get(self.callbacks.user_data) },
            None => false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_last_error(message: String) {
    *lock(&LAST_ERROR) = message;
}

fn fail(call: &'static str, message: String) -> i32 {
    error!(
        "event=ffi_call module=ffi status=error call={} error={}",
        call, message
    );
    set_last_error(message);
    SENTINEL_FAILURE
}

fn guard<R>(call: &'static str, fallback: R, body: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            error!("event=ffi_panic module=ffi status=error call={}", call);
            set_last_error(format!("{call} panicked"));
            fallback
        }
    }
}

/// Runs `body` against the live runtime, then flushes queued availability
/// notifications with the lock released.
fn with_runtime<R: Clone>(
    call: &'static str,
    fallback: R,
    body: impl FnOnce(&mut FrameXrRuntime) -> R,
) -> R {
    let value = guard(call, fallback.clone(), || {
        let mut slot = lock(&RUNTIME);
        match slot.as_mut() {
            Some(runtime) => body(runtime),
            None => {
                warn!(
                    "event=ffi_call module=ffi status=skipped call={} reason=no_runtime",
                    call
                );
                fallback
            }
        }
    });
    dispatch_pending_available();
    value
}

fn dispatch_pending_available() {
    let pending = std::mem::take(&mut *lock(&PENDING_AVAILABLE));
    if pending.is_empty() {
        return;
    }
    let Some(callback) = *lock(&AVAILABLE_CALLBACK) else {
        return;
    };
    for event in pending {
        info!(
            "event=ffi_available module=ffi status=ok feature={} session={}",
            event.feature,
            event.session.into_raw()
        );
        // SAFETY: registered by the host together with `user_data`.
        unsafe { (callback.function)(callback.user_data, event.session.into_raw()) };
    }
}

/// Reads an optional UTF-8 C string.
///
/// # Safety
/// `ptr` is null or points at a NUL-terminated string.
unsafe fn read_str(ptr: *const c_char) -> Result<Option<String>, String> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(|value| Some(value.to_string()))
        .map_err(|err| format!("argument is not valid UTF-8: {err}"))
}

/// # Safety
/// `buffer` is null or points at `capacity` writable bytes.
unsafe fn write_c_string(value: &str, buffer: *mut c_char, capacity: u32) -> i32 {
    let bytes = value.as_bytes();
    let required = bytes.len() + 1;
    if !buffer.is_null() && capacity as usize >= required {
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, bytes.len());
        *buffer.add(bytes.len()) = 0;
    }
    i32::try_from(required).unwrap_or(i32::MAX)
}

fn flag(value: bool) -> i32 {
    i32::from(value)
}

/// Core crate version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn framexr_core_version() -> *const c_char {
    VERSION.as_ptr()
}

/// Starts rolling file logs once per process.
///
/// Returns `0` on success, `-1` otherwise (see [`framexr_last_error`]).
/// Repeating the same `level` and `log_dir` is a no-op; any other
/// configuration after the first is rejected.
///
/// # Safety
/// Both arguments are null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn framexr_init_logging(level: *const c_char, log_dir: *const c_char) -> i32 {
    guard("init_logging", SENTINEL_FAILURE, || {
        let (level, log_dir) = match (read_str(level), read_str(log_dir)) {
            (Ok(level), Ok(log_dir)) => (level.unwrap_or_default(), log_dir.unwrap_or_default()),
            (Err(message), _) | (_, Err(message)) => return fail("init_logging", message),
        };
        match init_logging(&level, &log_dir) {
            Ok(()) => 0,
            Err(err) => fail("init_logging", err.to_string()),
        }
    })
}

/// Copies the last recorded error message into `buffer`.
///
/// # Safety
/// `buffer` is null or points at `capacity` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn framexr_last_error(buffer: *mut c_char, capacity: u32) -> i32 {
    guard("last_error", SENTINEL_FAILURE, || {
        let message = lock(&LAST_ERROR).clone();
        write_c_string(&message, buffer, capacity)
    })
}

/// Creates the process-wide runtime, replacing any previous one.
///
/// `enabled_extensions` is the whitespace-separated list of extensions the
/// host enabled on the instance. `settings_json` is the serialised project
/// settings; null selects defaults. Returns `0` or `-1`.
///
/// # Safety
/// String arguments are null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn framexr_runtime_init(
    get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>,
    enabled_extensions: *const c_char,
    settings_json: *const c_char,
) -> i32 {
    guard("runtime_init", SENTINEL_FAILURE, || {
        let extensions = match read_str(enabled_extensions) {
            Ok(extensions) => extensions.unwrap_or_default(),
            Err(message) => return fail("runtime_init", message),
        };
        let settings = match read_str(settings_json) {
            Ok(Some(raw)) => match ProjectSettings::from_json_str(&raw) {
                Ok(settings) => settings,
                Err(err) => return fail("runtime_init", err.to_string()),
            },
            Ok(None) => ProjectSettings::default(),
            Err(message) => return fail("runtime_init", message),
        };

        let host = StaticHost::from_extension_list(get_instance_proc_addr, &extensions);
        let runtime = FrameXrRuntime::new(Box::new(host), settings);
        let replaced = lock(&RUNTIME).replace(runtime).is_some();
        *lock(&AVAILABLE_SUBSCRIPTION) = None;
        lock(&PENDING_AVAILABLE).clear();
        info!(
            "event=ffi_runtime_init module=ffi status=ok replaced={} accessor={}",
            replaced,
            get_instance_proc_addr.is_some()
        );
        0
    })
}

/// Drops the runtime. Returns `1` if one was running, `0` otherwise.
#[no_mangle]
pub extern "C" fn framexr_runtime_shutdown() -> i32 {
    guard("runtime_shutdown", SENTINEL_FAILURE, || {
        let dropped = lock(&RUNTIME).take().is_some();
        *lock(&AVAILABLE_CALLBACK) = None;
        *lock(&AVAILABLE_SUBSCRIPTION) = None;
        lock(&PENDING_AVAILABLE).clear();
        info!(
            "event=ffi_runtime_shutdown module=ffi status=ok dropped={}",
            dropped
        );
        flag(dropped)
    })
}

/// Returns `1` when every enabled feature accepts the instance, `0` when one
/// rejects it, `-1` without a runtime.
#[no_mangle]
pub extern "C" fn framexr_on_instance_create(instance: u64) -> i32 {
    with_runtime("on_instance_create", SENTINEL_FAILURE, |runtime| {
        flag(runtime.on_instance_create(sys::Instance::from_raw(instance)))
    })
}

#[no_mangle]
pub extern "C" fn framexr_on_instance_destroy(instance: u64) {
    with_runtime("on_instance_destroy", (), |runtime| {
        runtime.on_instance_destroy(sys::Instance::from_raw(instance));
    });
}

#[no_mangle]
pub extern "C" fn framexr_on_system_change(system: u64) {
    with_runtime("on_system_change", (), |runtime| {
        runtime.on_system_change(sys::SystemId::from_raw(system));
    });
}

#[no_mangle]
pub extern "C" fn framexr_on_session_create(session: u64) {
    with_runtime("on_session_create", (), |runtime| {
        runtime.on_session_create(sys::Session::from_raw(session));
    });
}

#[no_mangle]
pub extern "C" fn framexr_on_session_begin(session: u64) {
    with_runtime("on_session_begin", (), |runtime| {
        runtime.on_session_begin(sys::Session::from_raw(session));
    });
}

/// `old` and `new` are raw `XrSessionState` values.
#[no_mangle]
pub extern "C" fn framexr_on_session_state_change(old: i32, new: i32) {
    with_runtime("on_session_state_change", (), |runtime| {
        runtime.on_session_state_change(SessionState::from_raw(old), SessionState::from_raw(new));
    });
}

#[no_mangle]
pub extern "C" fn framexr_on_session_end(session: u64) {
    with_runtime("on_session_end", (), |runtime| {
        runtime.on_session_end(sys::Session::from_raw(session));
    });
}

#[no_mangle]
pub extern "C" fn framexr_on_session_destroy(session: u64) {
    with_runtime("on_session_destroy", (), |runtime| {
        runtime.on_session_destroy(sys::Session::from_raw(session));
    });
}

/// Resolves `name` through the support feature; null when unavailable.
///
/// # Safety
/// `name` is null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn framexr_get_instance_proc(
    name: *const c_char,
) -> Option<sys::pfn::VoidFunction> {
    let name = match read_str(name) {
        Ok(Some(name)) => name,
        Ok(None) => return None,
        Err(message) => {
            fail("get_instance_proc", message);
            return None;
        }
    };
    with_runtime("get_instance_proc", None, |runtime| {
        runtime.support()?.get_instance_proc(&name)
    })
}

/// Registers the host display callbacks; null removes them.
///
/// Returns `1` when the foveation feature is enabled, `0` otherwise, `-1`
/// without a runtime.
///
/// # Safety
/// `callbacks` is null or points at a valid [`FoveationCallbacks`].
#[no_mangle]
pub unsafe extern "C" fn framexr_set_foveation_callbacks(
    callbacks: *const FoveationCallbacks,
) -> i32 {
    let callbacks = if callbacks.is_null() {
        None
    } else {
        Some(*callbacks)
    };
    with_runtime("set_foveation_callbacks", SENTINEL_FAILURE, |runtime| {
        match callbacks {
            Some(callbacks) => {
                flag(runtime.set_foveation_display(Box::new(CallbackDisplay { callbacks })))
            }
            None => match runtime.foveation_mut() {
                Some(foveation) => {
                    foveation.set_display(None);
                    1
                }
                None => 0,
            },
        }
    })
}

/// Normalised foveation level, `-1.0` when the feature is disabled.
#[no_mangle]
pub extern "C" fn framexr_get_foveation_level() -> f32 {
    with_runtime("get_foveation_level", SENTINEL_FAILURE_F32, |runtime| {
        runtime
            .foveation()
            .map(|foveation| foveation.foveation_level())
            .unwrap_or(SENTINEL_FAILURE_F32)
    })
}

/// Sets the normalised level; returns the discrete level applied or `-1`.
#[no_mangle]
pub extern "C" fn framexr_set_foveation_level(value: f32) -> i32 {
    with_runtime("set_foveation_level", SENTINEL_FAILURE, |runtime| {
        let Some(foveation) = runtime.foveation_mut() else {
            return SENTINEL_FAILURE;
        };
        match foveation.set_foveation_level(value) {
            Ok(level) => i32::try_from(level.as_raw()).unwrap_or(SENTINEL_FAILURE),
            Err(err) => err.result_code(),
        }
    })
}

#[no_mangle]
pub extern "C" fn framexr_get_eye_tracked_foveation() -> i32 {
    with_runtime("get_eye_tracked_foveation", SENTINEL_FAILURE, |runtime| {
        runtime
            .foveation()
            .map(|foveation| flag(foveation.eye_tracked_foveation()))
            .unwrap_or(SENTINEL_FAILURE)
    })
}

#[no_mangle]
pub extern "C" fn framexr_set_eye_tracked_foveation(eye_tracked: bool) -> i32 {
    with_runtime("set_eye_tracked_foveation", SENTINEL_FAILURE, |runtime| {
        let Some(foveation) = runtime.foveation_mut() else {
            return SENTINEL_FAILURE;
        };
        match foveation.set_eye_tracked_foveation(eye_tracked) {
            Ok(()) => 0,
            Err(err) => err.result_code(),
        }
    })
}

/// Writes `[left.x, left.y, right.x, right.y]` into `centers`.
///
/// Returns `1` for a valid sample, `0` when the runtime has none, a negative
/// code on failure.
///
/// # Safety
/// `centers` points at four writable floats.
#[no_mangle]
pub unsafe extern "C" fn framexr_get_eye_tracked_center(centers: *mut f32) -> i32 {
    if centers.is_null() {
        return fail("get_eye_tracked_center", "centers is null".to_string());
    }
    let sample = with_runtime("get_eye_tracked_center", Err(SENTINEL_FAILURE), |runtime| {
        let Some(foveation) = runtime.foveation_mut() else {
            return Err(SENTINEL_FAILURE);
        };
        foveation
            .eye_tracked_center()
            .map_err(|err| err.result_code())
    });
    match sample {
        Ok(Some([left, right])) => {
            for (index, value) in [left.x, left.y, right.x, right.y].into_iter().enumerate() {
                *centers.add(index) = value;
            }
            1
        }
        Ok(None) => 0,
        Err(code) => code,
    }
}

#[no_mangle]
pub extern "C" fn framexr_get_display_refresh_rate() -> f32 {
    with_runtime("get_display_refresh_rate", SENTINEL_FAILURE_F32, |runtime| {
        runtime
            .refresh_rate()
            .map(|refresh| refresh.refresh_rate())
            .unwrap_or(SENTINEL_FAILURE_F32)
    })
}

/// Returns the runtime's result code, or `-1`.
#[no_mangle]
pub extern "C" fn framexr_request_display_refresh_rate(rate: f32) -> i32 {
    with_runtime("request_display_refresh_rate", SENTINEL_FAILURE, |runtime| {
        runtime
            .refresh_rate()
            .map(|refresh| refresh.request_refresh_rate(rate))
            .unwrap_or(SENTINEL_FAILURE)
    })
}

/// Two-call enumeration of supported refresh rates.
///
/// Always stores the rate count in `count_out`. With `capacity == 0` only the
/// count is reported; a smaller non-zero capacity returns
/// `XR_ERROR_SIZE_INSUFFICIENT`.
///
/// # Safety
/// `count_out` points at a writable `u32`; `rates` is null or points at
/// `capacity` writable floats.
#[no_mangle]
pub unsafe extern "C" fn framexr_enumerate_display_refresh_rates(
    capacity: u32,
    count_out: *mut u32,
    rates: *mut f32,
) -> i32 {
    if count_out.is_null() {
        return fail("enumerate_display_refresh_rates", "count_out is null".to_string());
    }
    let listed = with_runtime(
        "enumerate_display_refresh_rates",
        Err(SENTINEL_FAILURE),
        |runtime| {
            let Some(refresh) = runtime.refresh_rate() else {
                return Err(SENTINEL_FAILURE);
            };
            let mut values = Vec::new();
            match refresh.enumerate_refresh_rates_into(&mut values) {
                0 => Ok(values),
                code => Err(code),
            }
        },
    );
    let values = match listed {
        Ok(values) => values,
        Err(code) => return code,
    };
    *count_out = u32::try_from(values.len()).unwrap_or(u32::MAX);
    if capacity == 0 {
        return sys::Result::SUCCESS.into_raw();
    }
    if (capacity as usize) < values.len() || rates.is_null() {
        return sys::Result::ERROR_SIZE_INSUFFICIENT.into_raw();
    }
    std::ptr::copy_nonoverlapping(values.as_ptr(), rates, values.len());
    sys::Result::SUCCESS.into_raw()
}

/// Registers `callback` for the next time refresh-rate control becomes
/// available; null unregisters.
///
/// A new registration replaces the previous one. The subscription ends with
/// the session, as it does in the core feature.
/// Returns `0`, or `-1` when the feature is disabled or no runtime runs.
#[no_mangle]
pub extern "C" fn framexr_set_refresh_rate_available_callback(
    callback: Option<RefreshRateAvailableFn>,
    user_data: *mut c_void,
) -> i32 {
    let registration = callback.map(|function| AvailableCallback {
        function,
        user_data,
    });
    with_runtime(
        "set_refresh_rate_available_callback",
        SENTINEL_FAILURE,
        |runtime| {
            let Some(refresh) = runtime.refresh_rate_mut() else {
                return SENTINEL_FAILURE;
            };
            let mut subscription = lock(&AVAILABLE_SUBSCRIPTION);
            if let Some(previous) = subscription.take() {
                refresh.remove_available_subscriber(previous);
            }
            *lock(&AVAILABLE_CALLBACK) = registration;
            if registration.is_some() {
                *subscription = Some(
                    refresh.on_available(|event| lock(&PENDING_AVAILABLE).push(*event)),
                );
            }
            0
        },
    )
}

/// `1` on a Steam Frame, `0` elsewhere, `-1` when system info is disabled.
#[no_mangle]
pub extern "C" fn framexr_is_running_on_steam_frame() -> i32 {
    with_runtime("is_running_on_steam_frame", SENTINEL_FAILURE, |runtime| {
        runtime
            .system_info()
            .map(|info| flag(info.is_running_on_steam_frame()))
            .unwrap_or(SENTINEL_FAILURE)
    })
}

/// Copies the runtime's system name into `buffer`; `-1` when unavailable.
///
/// # Safety
/// `buffer` is null or points at `capacity` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn framexr_get_headset_name(buffer: *mut c_char, capacity: u32) -> i32 {
    let name = with_runtime("get_headset_name", None, |runtime| {
        runtime.system_info().and_then(|info| info.headset_name())
    });
    match name {
        Some(name) => write_c_string(&name, buffer, capacity),
        None => SENTINEL_FAILURE,
    }
}
