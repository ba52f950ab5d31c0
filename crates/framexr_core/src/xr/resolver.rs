//! Extension function lookup through the loader's proc-address table.
//!
//! # Responsibility
//! - Turn `(instance, function name)` into a native call target.
//!
//! # Invariants
//! - Every failure (disabled extension, invalid instance, missing entry point,
//!   missing host accessor) collapses into one `FunctionNotFound` outcome.
//! - Lookup is read-only; the address table belongs to the runtime.

use crate::xr::host::XrHost;
use crate::xr::result::succeeded;
use log::warn;
use openxr_sys as sys;
use std::error::Error;
use std::ffi::CString;
use std::fmt::{Display, Formatter};

/// Resolves extension entry points against one instance.
#[derive(Clone, Copy, Default)]
pub struct FunctionResolver {
    get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>,
}

impl FunctionResolver {
    pub fn new(get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>) -> Self {
        Self {
            get_instance_proc_addr,
        }
    }

    pub fn from_host(host: &dyn XrHost) -> Self {
        Self::new(host.get_instance_proc_addr())
    }

    /// Whether the host supplied a proc-address accessor at all.
    pub fn has_accessor(&self) -> bool {
        self.get_instance_proc_addr.is_some()
    }

    /// Looks up `name` for `instance`.
    ///
    /// Callers must have confirmed the owning extension is enabled; a
    /// successful lookup says nothing about extension availability.
    pub fn resolve(
        &self,
        instance: sys::Instance,
        name: &str,
    ) -> Result<sys::pfn::VoidFunction, FunctionNotFound> {
        let not_found = |detail: String| {
            warn!(
                "event=xr_resolve module=xr status=error function={} detail={}",
                name, detail
            );
            FunctionNotFound {
                name: name.to_string(),
                detail,
            }
        };

        if instance.into_raw() == 0 {
            return Err(not_found("instance handle is null".to_string()));
        }
        let Some(get_instance_proc_addr) = self.get_instance_proc_addr else {
            return Err(not_found("host proc-address accessor is invalid".to_string()));
        };
        let c_name = CString::new(name)
            .map_err(|_| not_found("function name contains a NUL byte".to_string()))?;

        let mut function: Option<sys::pfn::VoidFunction> = None;
        // SAFETY: `c_name` outlives the call and `function` is a valid out slot.
        let result = unsafe { get_instance_proc_addr(instance, c_name.as_ptr(), &mut function) };
        if !succeeded(result) {
            return Err(not_found(format!(
                "xrGetInstanceProcAddr returned {}",
                result.into_raw()
            )));
        }
        function.ok_or_else(|| not_found("runtime returned a null function pointer".to_string()))
    }
}

/// Lookup failure for one extension function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNotFound {
    pub name: String,
    /// Diagnostic detail; callers must not branch on it.
    pub detail: String,
}

impl Display for FunctionNotFound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenXR function not found: {} ({})", self.name, self.detail)
    }
}

impl Error for FunctionNotFound {}
