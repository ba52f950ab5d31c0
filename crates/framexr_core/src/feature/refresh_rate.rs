//! Display refresh-rate control through `XR_FB_display_refresh_rate`.
//!
//! # Responsibility
//! - Resolve the three refresh-rate entry points when a session begins.
//! - Query, request and enumerate refresh rates for the bound session.
//!
//! # Invariants
//! - All three entry points are required; if any fails to resolve the
//!   feature never reaches `Initialized`.
//! - Operations outside `Initialized` perform no native call.
//! - Sentinel-returning wrappers report `-1` for non-runtime failures and the
//!   runtime's own code for runtime failures.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::extension::XR_FB_DISPLAY_REFRESH_RATE;
use crate::feature::facade::{FacadeCore, FeatureAvailable};
use crate::feature::{Feature, REFRESH_RATE_FEATURE_ID};
use crate::settings::BuildTarget;
use crate::xr::binding::{enumerate_two_call, Binding, ExtensionFunction};
use crate::xr::functions::{
    EnumerateDisplayRefreshRatesFB, GetDisplayRefreshRateFB, RequestDisplayRefreshRateFB,
};
use crate::xr::host::XrHost;
use crate::xr::observer::SubscriptionId;
use crate::xr::result::{check, CallResult, XrCallError, SENTINEL_FAILURE_F32};
use crate::xr::session::LifecycleState;
use log::{error, warn};
use openxr_sys as sys;

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        REFRESH_RATE_FEATURE_ID,
        "Valve Utils: Refresh Rate",
        "Retrieve current hmd refresh rate",
        "1",
        &[XR_FB_DISPLAY_REFRESH_RATE],
        &[BuildTarget::Standalone, BuildTarget::Wsa, BuildTarget::Android],
    )
}

struct RefreshRateFunctions {
    get: Binding<GetDisplayRefreshRateFB>,
    request: Binding<RequestDisplayRefreshRateFB>,
    enumerate: Binding<EnumerateDisplayRefreshRatesFB>,
}

pub struct RefreshRateFeature {
    core: FacadeCore,
    functions: Option<RefreshRateFunctions>,
}

impl Default for RefreshRateFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshRateFeature {
    pub fn new() -> Self {
        Self {
            core: FacadeCore::new("refresh_rate", XR_FB_DISPLAY_REFRESH_RATE),
            functions: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.core.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    pub fn core(&self) -> &FacadeCore {
        &self.core
    }

    /// Subscribes to "refresh rate available"; cleared on every teardown.
    pub fn on_available(
        &mut self,
        callback: impl FnMut(&FeatureAvailable) + Send + 'static,
    ) -> SubscriptionId {
        self.core.subscribe_available(callback)
    }

    pub fn remove_available_subscriber(&mut self, id: SubscriptionId) -> bool {
        self.core.unsubscribe_available(id)
    }

    fn bound(&self) -> CallResult<(sys::Session, &RefreshRateFunctions)> {
        let handles = self.core.require_initialized()?;
        let functions = self
            .functions
            .as_ref()
            .ok_or(XrCallError::NotInitialized(self.core.feature()))?;
        Ok((handles.session, functions))
    }

    /// Current display refresh rate in Hz.
    pub fn try_refresh_rate(&self) -> CallResult<f32> {
        let (session, functions) = self.bound()?;
        let get = functions.get.get(self.core.generation())?;
        let mut rate = 0.0f32;
        // SAFETY: `get` was resolved for the live instance; `rate` is a valid out slot.
        let result = unsafe { get(session, &mut rate) };
        check(GetDisplayRefreshRateFB::NAME, result)?;
        Ok(rate)
    }

    /// Asks the runtime to switch to `rate` Hz.
    pub fn try_request_refresh_rate(&self, rate: f32) -> CallResult<sys::Result> {
        let (session, functions) = self.bound()?;
        let request = functions.request.get(self.core.generation())?;
        // SAFETY: `request` was resolved for the live instance.
        let result = unsafe { request(session, rate) };
        check(RequestDisplayRefreshRateFB::NAME, result)
    }

    /// Refresh rates the display supports, via the two-call idiom.
    pub fn try_enumerate_refresh_rates(&self) -> CallResult<Vec<f32>> {
        let (session, functions) = self.bound()?;
        let enumerate = functions.enumerate.get(self.core.generation())?;
        enumerate_two_call(
            EnumerateDisplayRefreshRatesFB::NAME,
            |capacity, count, buffer| {
                // SAFETY: `buffer` is null with capacity 0 or points at
                // `capacity` writable floats.
                unsafe { enumerate(session, capacity, count, buffer) }
            },
        )
    }

    /// Current refresh rate, or `-1.0` on any failure.
    pub fn refresh_rate(&self) -> f32 {
        self.try_refresh_rate().unwrap_or_else(|err| {
            self.log_failure("get", &err);
            SENTINEL_FAILURE_F32
        })
    }

    /// Requests `rate` Hz and returns the raw result code.
    pub fn request_refresh_rate(&self, rate: f32) -> i32 {
        match self.try_request_refresh_rate(rate) {
            Ok(result) => result.into_raw(),
            Err(err) => {
                self.log_failure("request", &err);
                err.result_code()
            }
        }
    }

    /// Clears `rates`, fills it with the supported refresh rates and returns
    /// the raw result code.
    pub fn enumerate_refresh_rates_into(&self, rates: &mut Vec<f32>) -> i32 {
        rates.clear();
        match self.try_enumerate_refresh_rates() {
            Ok(values) => {
                rates.extend(values);
                sys::Result::SUCCESS.into_raw()
            }
            Err(err) => {
                self.log_failure("enumerate", &err);
                err.result_code()
            }
        }
    }

    fn log_failure(&self, operation: &str, err: &XrCallError) {
        match err {
            XrCallError::RuntimeFailure { .. } => warn!(
                "event=refresh_rate_call module=feature status=error op={} error={}",
                operation, err
            ),
            _ => error!(
                "event=refresh_rate_call module=feature status=error op={} error={} extension={}",
                operation,
                err,
                self.core.extension()
            ),
        }
    }
}

impl Feature for RefreshRateFeature {
    fn id(&self) -> &'static str {
        REFRESH_RATE_FEATURE_ID
    }

    fn on_instance_create(&mut self, host: &dyn XrHost, instance: sys::Instance) -> bool {
        self.functions = None;
        self.core.on_instance_create(host, instance);
        true
    }

    fn on_instance_destroy(&mut self, instance: sys::Instance) {
        self.functions = None;
        self.core.on_instance_destroy(instance);
    }

    fn on_session_begin(&mut self, host: &dyn XrHost, session: sys::Session) {
        self.functions = self.core.on_session_begin(host, session, |bindings, resolver| {
            Ok(RefreshRateFunctions {
                get: bindings.resolve::<GetDisplayRefreshRateFB>(resolver)?,
                request: bindings.resolve::<RequestDisplayRefreshRateFB>(resolver)?,
                enumerate: bindings.resolve::<EnumerateDisplayRefreshRatesFB>(resolver)?,
            })
        });
    }

    fn on_session_end(&mut self, session: sys::Session) {
        self.functions = None;
        self.core.on_session_teardown(session);
    }

    fn on_session_destroy(&mut self, session: sys::Session) {
        self.functions = None;
        self.core.on_session_teardown(session);
    }
}
