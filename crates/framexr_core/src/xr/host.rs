//! Host runtime services consumed by features.

use openxr_sys as sys;
use std::collections::BTreeSet;

/// Services the host's OpenXR integration exposes to features.
///
/// The host owns the loader, the instance and session handles, and the
/// enabled-extension list; features only read them.
pub trait XrHost {
    /// The loader's `xrGetInstanceProcAddr`, when the host has one.
    fn get_instance_proc_addr(&self) -> Option<sys::pfn::GetInstanceProcAddr>;

    /// Whether the runtime reports `extension` enabled for the live instance.
    fn is_extension_enabled(&self, extension: &str) -> bool;
}

/// Host backed by a fixed proc-address accessor and extension list.
#[derive(Clone, Default)]
pub struct StaticHost {
    get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>,
    enabled_extensions: BTreeSet<String>,
}

impl StaticHost {
    pub fn new(get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>) -> Self {
        Self {
            get_instance_proc_addr,
            enabled_extensions: BTreeSet::new(),
        }
    }

    /// Builds a host from a whitespace-separated extension list, the format
    /// OpenXR feature declarations use.
    pub fn from_extension_list(
        get_instance_proc_addr: Option<sys::pfn::GetInstanceProcAddr>,
        extensions: &str,
    ) -> Self {
        let mut host = Self::new(get_instance_proc_addr);
        for extension in extensions.split_whitespace() {
            host.enable_extension(extension);
        }
        host
    }

    pub fn with_extensions<'a>(mut self, extensions: impl IntoIterator<Item = &'a str>) -> Self {
        for extension in extensions {
            self.enable_extension(extension);
        }
        self
    }

    pub fn enable_extension(&mut self, extension: &str) {
        let trimmed = extension.trim();
        if !trimmed.is_empty() {
            self.enabled_extensions.insert(trimmed.to_string());
        }
    }

    pub fn disable_extension(&mut self, extension: &str) {
        self.enabled_extensions.remove(extension.trim());
    }

    pub fn enabled_extensions(&self) -> impl Iterator<Item = &str> {
        self.enabled_extensions.iter().map(String::as_str)
    }
}

impl XrHost for StaticHost {
    fn get_instance_proc_addr(&self) -> Option<sys::pfn::GetInstanceProcAddr> {
        self.get_instance_proc_addr
    }

    fn is_extension_enabled(&self, extension: &str) -> bool {
        self.enabled_extensions.contains(extension)
    }
}
