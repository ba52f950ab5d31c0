//! Build-time integration: boot config, Android manifest, per-feature hooks.

pub mod boot_config;
pub mod hooks;
pub mod manifest;
pub mod pipeline;
