//! Core of the FrameXR OpenXR utilities.
//! Resolver, typed invoker, feature facades, build hooks and validation live
//! here; the FFI and CLI crates are thin shells over this crate.

pub mod build;
pub mod feature;
pub mod input;
pub mod logging;
pub mod runtime;
pub mod settings;
pub mod validation;
pub mod xr;

pub use build::pipeline::{BuildError, BuildOutputs, BuildPipeline, BuildReport};
pub use feature::foveation::{FoveationDisplay, FoveationFeature, FoveationLevel};
pub use feature::refresh_rate::RefreshRateFeature;
pub use feature::registry::{FeatureRegistry, RegistryError};
pub use feature::system_info::SystemInfoFeature;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use runtime::FrameXrRuntime;
pub use settings::{BuildTarget, ProjectSettings, SettingsError};
pub use validation::{apply_automatic_fixes, validate, ValidationIssue};
pub use xr::host::{StaticHost, XrHost};
pub use xr::result::{CallResult, XrCallError};
pub use xr::session::{LifecycleState, SessionState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
