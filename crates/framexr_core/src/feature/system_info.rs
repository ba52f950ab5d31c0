//! Headset identification from `xrGetSystemProperties`.
//!
//! # Responsibility
//! - Resolve `xrGetSystemProperties` for each new instance.
//! - Report the system name and whether it names a Steam Frame.
//!
//! # Invariants
//! - Initialised only with an instance, a system id and a resolved function.
//! - Headset names are matched as `family : driver`, trimmed and compared
//!   ASCII case-insensitively.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::{Feature, SYSTEM_INFO_FEATURE_ID};
use crate::settings::BuildTarget;
use crate::xr::binding::{Binding, BindingCache, ExtensionFunction, InstanceGeneration};
use crate::xr::functions::GetSystemProperties;
use crate::xr::host::XrHost;
use crate::xr::resolver::FunctionResolver;
use crate::xr::result::{check, CallResult, XrCallError};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use openxr_sys as sys;
use regex::Regex;
use std::ffi::CStr;

pub const STEAMVR_FAMILY_KEY: &str = "SteamVR/OpenXR";
pub const STEAM_FRAME_DRIVER_KEY: &str = "cv";

static HEADSET_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?<family>[^:]+)\s*:\s*(?<driver>.+)$").expect("valid headset name regex")
});

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        SYSTEM_INFO_FEATURE_ID,
        "Valve Utils: System Info",
        "Support for querying the system info.",
        "0.1.0",
        &[],
        &[BuildTarget::Standalone, BuildTarget::Android],
    )
}

/// Splits a system name into trimmed `(family, driver)`.
pub fn parse_headset_name(name: &str) -> Option<(&str, &str)> {
    let captures = HEADSET_NAME_RE.captures(name)?;
    let family = captures.name("family")?.as_str().trim();
    let driver = captures.name("driver")?.as_str().trim();
    Some((family, driver))
}

/// Whether `name` is `family : driver` for the given keys.
pub fn headset_name_matches(name: &str, family_key: &str, driver_key: &str) -> bool {
    match parse_headset_name(name) {
        Some((family, driver)) => {
            family.eq_ignore_ascii_case(family_key) && driver.eq_ignore_ascii_case(driver_key)
        }
        None => false,
    }
}

pub struct SystemInfoFeature {
    enabled: bool,
    instance: Option<sys::Instance>,
    system: Option<sys::SystemId>,
    last_generation: Option<InstanceGeneration>,
    bindings: BindingCache,
    get_system_properties: Option<Binding<GetSystemProperties>>,
}

impl SystemInfoFeature {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            instance: None,
            system: None,
            last_generation: None,
            bindings: BindingCache::new(),
            get_system_properties: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.enabled
            && self.instance.is_some()
            && self.system.is_some()
            && self.get_system_properties.is_some()
    }

    /// System name reported by the runtime.
    pub fn try_headset_name(&self) -> CallResult<String> {
        let (Some(instance), Some(system), Some(binding)) =
            (self.instance, self.system, self.get_system_properties)
        else {
            return Err(XrCallError::NotInitialized("system_info"));
        };
        let get_properties = binding.get(self.bindings.generation())?;

        // SAFETY: every field of `XrSystemProperties` is plain data for which
        // all-zero bytes are valid.
        let mut properties: sys::SystemProperties = unsafe { std::mem::zeroed() };
        properties.ty = sys::StructureType::SYSTEM_PROPERTIES;
        // SAFETY: `get_properties` was resolved for `instance` and
        // `properties` is a correctly typed output structure.
        let result = unsafe { get_properties(instance, system, &mut properties) };
        check(GetSystemProperties::NAME, result)?;
        Ok(decode_system_name(&properties.system_name))
    }

    /// System name, or `None` when unavailable.
    pub fn headset_name(&self) -> Option<String> {
        match self.try_headset_name() {
            Ok(name) => Some(name),
            Err(err) => {
                debug!(
                    "event=system_info_name module=feature status=error error={}",
                    err
                );
                None
            }
        }
    }

    pub fn headset_matches(&self, family_key: &str, driver_key: &str) -> bool {
        let Some(name) = self.headset_name() else {
            return false;
        };
        debug!(
            "event=system_info_match module=feature status=ok headset={}",
            name
        );
        !name.is_empty() && headset_name_matches(&name, family_key, driver_key)
    }

    pub fn is_running_on_steam_frame(&self) -> bool {
        self.headset_matches(STEAMVR_FAMILY_KEY, STEAM_FRAME_DRIVER_KEY)
    }
}

fn decode_system_name(raw: &[std::ffi::c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl Feature for SystemInfoFeature {
    fn id(&self) -> &'static str {
        SYSTEM_INFO_FEATURE_ID
    }

    fn on_instance_create(&mut self, host: &dyn XrHost, instance: sys::Instance) -> bool {
        if instance.into_raw() == 0 {
            warn!("event=system_info_instance_create module=feature status=skipped reason=null_instance");
            self.on_instance_destroy(instance);
            return true;
        }
        let generation = self
            .last_generation
            .map(InstanceGeneration::next)
            .unwrap_or_else(InstanceGeneration::first);
        self.last_generation = Some(generation);
        self.instance = Some(instance);
        self.bindings.bind_instance(instance, generation);

        let resolver = FunctionResolver::from_host(host);
        self.get_system_properties = match self.bindings.resolve::<GetSystemProperties>(&resolver) {
            Ok(binding) => Some(binding),
            Err(err) => {
                warn!(
                    "event=system_info_resolve module=feature status=error error={}",
                    err
                );
                None
            }
        };
        info!(
            "event=system_info_instance_create module=feature status=ok resolved={}",
            self.get_system_properties.is_some()
        );
        true
    }

    fn on_instance_destroy(&mut self, _instance: sys::Instance) {
        self.bindings.invalidate();
        self.get_system_properties = None;
        self.instance = None;
        self.system = None;
    }

    fn on_system_change(&mut self, system: sys::SystemId) {
        // XR_NULL_SYSTEM_ID means no system.
        self.system = (system.into_raw() != 0).then_some(system);
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_system_name, headset_name_matches, parse_headset_name, SystemInfoFeature};
    use crate::feature::Feature;
    use openxr_sys as sys;

    #[test]
    fn parses_family_and_driver() {
        assert_eq!(
            parse_headset_name("SteamVR/OpenXR : cv"),
            Some(("SteamVR/OpenXR", "cv"))
        );
        assert_eq!(parse_headset_name("no separator"), None);
        assert_eq!(parse_headset_name(":cv"), None);
    }

    #[test]
    fn matches_case_insensitively_after_trimming() {
        assert!(headset_name_matches("steamvr/openxr:CV ", "SteamVR/OpenXR", "cv"));
        assert!(!headset_name_matches("SteamVR/OpenXR : lighthouse", "SteamVR/OpenXR", "cv"));
        assert!(!headset_name_matches("Oculus : cv", "SteamVR/OpenXR", "cv"));
    }

    #[test]
    fn decodes_nul_terminated_buffer() {
        let mut raw = [0 as std::ffi::c_char; 8];
        for (slot, byte) in raw.iter_mut().zip(b"Frame".iter()) {
            *slot = *byte as std::ffi::c_char;
        }
        assert_eq!(decode_system_name(&raw), "Frame");
    }

    #[test]
    fn not_initialized_without_system_id() {
        let mut feature = SystemInfoFeature::new(true);
        assert!(!feature.is_initialized());
        feature.on_system_change(sys::SystemId::from_raw(3));
        assert!(!feature.is_initialized());
        assert_eq!(feature.headset_name(), None);
        assert!(!feature.is_running_on_steam_frame());
    }
}
