//! Result-code convention and the shared call error taxonomy.
//!
//! # Responsibility
//! - Decide success/failure for raw OpenXR `XrResult` values.
//! - Define the one error type every facade operation returns.
//!
//! # Invariants
//! - A raw code `>= 0` is success (`XR_SUCCEEDED`); `0` is the only unqualified
//!   success. Negative codes are failures and are never swallowed.
//! - Boundary sentinels are derived from `XrCallError`, never invented ad hoc.

use log::debug;
use openxr_sys as sys;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Out-of-band value returned across the host boundary when an operation
/// cannot be satisfied.
pub const SENTINEL_FAILURE: i32 = -1;

/// Float flavour of [`SENTINEL_FAILURE`] for getters returning `f32`.
pub const SENTINEL_FAILURE_F32: f32 = -1.0;

pub type CallResult<T> = Result<T, XrCallError>;

/// Returns whether `result` counts as success under `XR_SUCCEEDED`.
pub fn succeeded(result: sys::Result) -> bool {
    result.into_raw() >= 0
}

/// Returns whether `result` is exactly `XR_SUCCESS`.
pub fn is_unqualified_success(result: sys::Result) -> bool {
    result == sys::Result::SUCCESS
}

/// Converts a raw result of `function` into a `CallResult`.
///
/// Qualified successes (positive codes) pass through and are logged at debug.
pub fn check(function: &'static str, result: sys::Result) -> CallResult<sys::Result> {
    if !succeeded(result) {
        return Err(XrCallError::RuntimeFailure {
            function,
            code: result.into_raw(),
        });
    }
    if !is_unqualified_success(result) {
        debug!(
            "event=xr_call module=xr status=qualified function={} code={}",
            function,
            result.into_raw()
        );
    }
    Ok(result)
}

/// Failure classes shared by all feature facades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrCallError {
    /// The runtime does not report the governing extension as enabled.
    ExtensionUnavailable(&'static str),
    /// The extension is available but the entry point could not be located.
    FunctionUnresolved(&'static str),
    /// The operation was attempted outside the facade's valid lifecycle window.
    NotInitialized(&'static str),
    /// A cached binding was used after its instance was replaced or destroyed.
    StaleBinding {
        function: &'static str,
        bound_generation: u64,
        current_generation: Option<u64>,
    },
    /// The native call itself returned a failure code.
    RuntimeFailure { function: &'static str, code: i32 },
}

impl XrCallError {
    /// Result code reported to boundary callers that expect an integer.
    ///
    /// Runtime failures keep the runtime's own code; everything else maps to
    /// [`SENTINEL_FAILURE`].
    pub fn result_code(&self) -> i32 {
        match self {
            Self::RuntimeFailure { code, .. } => *code,
            _ => SENTINEL_FAILURE,
        }
    }
}

impl Display for XrCallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExtensionUnavailable(extension) => {
                write!(f, "extension not enabled: {extension}")
            }
            Self::FunctionUnresolved(function) => {
                write!(f, "failed to resolve OpenXR function: {function}")
            }
            Self::NotInitialized(feature) => write!(f, "{feature} is not set up"),
            Self::StaleBinding {
                function,
                bound_generation,
                current_generation,
            } => match current_generation {
                Some(current) => write!(
                    f,
                    "binding for {function} belongs to instance generation {bound_generation}, current is {current}"
                ),
                None => write!(
                    f,
                    "binding for {function} belongs to destroyed instance generation {bound_generation}"
                ),
            },
            Self::RuntimeFailure { function, code } => {
                write!(f, "{function} returned failure code {code}")
            }
        }
    }
}

impl Error for XrCallError {}

#[cfg(test)]
mod tests {
    use super::{check, succeeded, XrCallError, SENTINEL_FAILURE};
    use openxr_sys as sys;

    #[test]
    fn success_follows_xr_succeeded() {
        assert!(succeeded(sys::Result::SUCCESS));
        assert!(succeeded(sys::Result::from_raw(3)));
        assert!(!succeeded(sys::Result::ERROR_FUNCTION_UNSUPPORTED));
        assert!(!succeeded(sys::Result::from_raw(-1)));
    }

    #[test]
    fn check_passes_qualified_success_and_rejects_failures() {
        let qualified = check("xrTest", sys::Result::from_raw(1)).expect("qualified success");
        assert_eq!(qualified.into_raw(), 1);

        let err = check("xrTest", sys::Result::ERROR_HANDLE_INVALID).unwrap_err();
        assert_eq!(
            err,
            XrCallError::RuntimeFailure {
                function: "xrTest",
                code: sys::Result::ERROR_HANDLE_INVALID.into_raw(),
            }
        );
    }

    #[test]
    fn result_code_keeps_runtime_code_and_maps_rest_to_sentinel() {
        let runtime = XrCallError::RuntimeFailure {
            function: "xrTest",
            code: -12,
        };
        assert_eq!(runtime.result_code(), -12);
        assert_eq!(
            XrCallError::NotInitialized("refresh rate").result_code(),
            SENTINEL_FAILURE
        );
        assert_eq!(
            XrCallError::FunctionUnresolved("xrTest").result_code(),
            SENTINEL_FAILURE
        );
    }
}
