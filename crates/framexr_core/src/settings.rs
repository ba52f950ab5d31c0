//! Project and feature configuration.
//!
//! # Responsibility
//! - Hold the serialised settings the features, build hooks and validation
//!   rules read (player settings, OpenXR settings, per-feature settings).
//! - Load and save them as JSON.
//!
//! # Invariants
//! - Missing fields fall back to defaults, so partial files load.
//! - `normalize()` runs after every load; stored levels stay in `[0, 1]`.

use crate::feature::{
    CONTROLLER_PROFILE_FEATURE_ID, DEVICE_VALIDATION_FEATURE_ID, FOVEATED_RENDERING_FEATURE_ID,
    REFRESH_RATE_FEATURE_ID, RENDER_REGIONS_FEATURE_ID, SUPPORT_FEATURE_ID,
    SYSTEM_INFO_FEATURE_ID,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Complete settings snapshot for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    pub engine_version: EngineVersion,
    /// Emit the pre-fragment-density-map boot-config key for foveation.
    pub use_legacy_boot_config: bool,
    pub player: PlayerSettings,
    pub openxr: OpenXrSettings,
    pub features: FeatureSettings,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            engine_version: EngineVersion::default(),
            use_legacy_boot_config: false,
            player: PlayerSettings::default(),
            openxr: OpenXrSettings::default(),
            features: FeatureSettings::default(),
        }
    }
}

impl ProjectSettings {
    /// Reads settings from a JSON file.
    ///
    /// # Errors
    /// - `SettingsError::Io` when the file cannot be read.
    /// - `SettingsError::Parse` when the content is not valid settings JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&raw)?;
        info!(
            "event=settings_load module=settings status=ok path={} features={}",
            path.display(),
            settings.enabled_feature_ids().len()
        );
        Ok(settings)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = serde_json::from_str(raw).map_err(SettingsError::Parse)?;
        settings.normalize();
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(SettingsError::Parse)
    }

    /// Writes settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
        }
        let raw = self.to_json_string()?;
        std::fs::write(path, raw).map_err(io_error)?;
        info!(
            "event=settings_save module=settings status=ok path={}",
            path.display()
        );
        Ok(())
    }

    /// Clamps out-of-range values and migrates legacy fields.
    pub fn normalize(&mut self) {
        let level = self.features.foveated_rendering.initial_foveation_level;
        self.features.foveated_rendering.initial_foveation_level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
        self.features.render_regions.migrate_legacy_mode();
    }

    pub fn is_feature_enabled(&self, feature_id: &str) -> bool {
        let features = &self.features;
        match feature_id {
            SUPPORT_FEATURE_ID => features.support.enabled,
            FOVEATED_RENDERING_FEATURE_ID => features.foveated_rendering.enabled,
            RENDER_REGIONS_FEATURE_ID => features.render_regions.enabled,
            DEVICE_VALIDATION_FEATURE_ID => features.validation.enabled,
            REFRESH_RATE_FEATURE_ID => features.refresh_rate.enabled,
            SYSTEM_INFO_FEATURE_ID => features.system_info.enabled,
            CONTROLLER_PROFILE_FEATURE_ID => features.controller_profile.enabled,
            _ => false,
        }
    }

    /// Toggles one feature by id; returns `false` for unknown ids.
    ///
    /// Enabling system info also enables the support feature it depends on.
    pub fn set_feature_enabled(&mut self, feature_id: &str, enabled: bool) -> bool {
        let features = &mut self.features;
        match feature_id {
            SUPPORT_FEATURE_ID => features.support.enabled = enabled,
            FOVEATED_RENDERING_FEATURE_ID => features.foveated_rendering.enabled = enabled,
            RENDER_REGIONS_FEATURE_ID => features.render_regions.enabled = enabled,
            DEVICE_VALIDATION_FEATURE_ID => features.validation.enabled = enabled,
            REFRESH_RATE_FEATURE_ID => features.refresh_rate.enabled = enabled,
            SYSTEM_INFO_FEATURE_ID => {
                features.system_info.enabled = enabled;
                if enabled {
                    features.support.enabled = true;
                }
            }
            CONTROLLER_PROFILE_FEATURE_ID => features.controller_profile.enabled = enabled,
            _ => return false,
        }
        true
    }

    pub fn enabled_feature_ids(&self) -> Vec<&'static str> {
        [
            SUPPORT_FEATURE_ID,
            FOVEATED_RENDERING_FEATURE_ID,
            RENDER_REGIONS_FEATURE_ID,
            DEVICE_VALIDATION_FEATURE_ID,
            REFRESH_RATE_FEATURE_ID,
            SYSTEM_INFO_FEATURE_ID,
            CONTROLLER_PROFILE_FEATURE_ID,
        ]
        .into_iter()
        .filter(|id| self.is_feature_enabled(id))
        .collect()
    }
}

/// Host engine version, `major.minor` (e.g. `6000.1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn at_least(self, major: u32, minor: u32) -> bool {
        self >= Self::new(major, minor)
    }
}

impl Default for EngineVersion {
    fn default() -> Self {
        Self::new(6000, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTarget {
    Standalone,
    Android,
    Wsa,
}

impl BuildTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Android => "android",
            Self::Wsa => "wsa",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standalone" => Some(Self::Standalone),
            "android" => Some(Self::Android),
            "wsa" => Some(Self::Wsa),
            _ => None,
        }
    }

    /// Targets whose default graphics API list starts with Vulkan.
    fn defaults_to_vulkan(self) -> bool {
        matches!(self, Self::Android)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsApi {
    Vulkan,
    OpenGles3,
    OpenGlCore,
    Direct3d11,
    Direct3d12,
    Metal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptingBackend {
    Mono,
    Il2cpp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AndroidArchitecture {
    Armv7,
    Arm64,
    X86,
    X86_64,
}

/// Player settings the validation rules inspect and fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub use_default_graphics_apis: bool,
    pub graphics_apis: Vec<GraphicsApi>,
    pub android_min_sdk_version: u32,
    pub scripting_backend: ScriptingBackend,
    pub android_target_architectures: Vec<AndroidArchitecture>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            use_default_graphics_apis: true,
            graphics_apis: Vec::new(),
            android_min_sdk_version: 23,
            scripting_backend: ScriptingBackend::Mono,
            android_target_architectures: vec![AndroidArchitecture::Armv7],
        }
    }
}

impl PlayerSettings {
    /// Whether `target` renders with Vulkan first.
    pub fn uses_vulkan(&self, target: BuildTarget) -> bool {
        if !self.use_default_graphics_apis {
            return self.graphics_apis.first() == Some(&GraphicsApi::Vulkan);
        }
        target.defaults_to_vulkan()
    }

    /// Pins the explicit graphics API list to Vulkan only.
    pub fn force_vulkan(&mut self) {
        self.use_default_graphics_apis = false;
        self.graphics_apis = vec![GraphicsApi::Vulkan];
    }

    pub fn targets_arm64_only(&self) -> bool {
        self.android_target_architectures == [AndroidArchitecture::Arm64]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    MultiPass,
    SinglePassInstanced,
}

/// Multiview render-regions optimisation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderRegionsMode {
    #[default]
    None,
    FinalPass,
    AllPasses,
}

impl RenderRegionsMode {
    /// Integer written to the boot config.
    pub fn as_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::FinalPass => 1,
            Self::AllPasses => 2,
        }
    }
}

/// Project-wide OpenXR settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenXrSettings {
    pub render_mode: RenderMode,
    pub symmetric_projection: bool,
    pub multiview_render_regions_optimization_mode: RenderRegionsMode,
}

impl Default for OpenXrSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::SinglePassInstanced,
            symmetric_projection: false,
            multiview_render_regions_optimization_mode: RenderRegionsMode::None,
        }
    }
}

/// Per-feature settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub support: SupportSettings,
    pub foveated_rendering: FoveationSettings,
    pub render_regions: RenderRegionsSettings,
    pub validation: ToggleSettings,
    pub refresh_rate: ToggleSettings,
    pub system_info: ToggleSettings,
    pub controller_profile: ToggleSettings,
    /// The host engine's own foveated rendering feature.
    pub engine_foveated_rendering: ToggleSettings,
    /// Another vendor's XR platform feature; incompatible with this package.
    pub meta_quest_support: ToggleSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportSettings {
    pub enabled: bool,
    /// Lets 4x MSAA textures be memoryless on Vulkan.
    pub optimize_buffer_discards: bool,
    pub late_latching_mode: bool,
    pub late_latching_debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoveationSettings {
    pub enabled: bool,
    pub apply_settings_on_startup: bool,
    /// Normalised level in `[0, 1]`.
    pub initial_foveation_level: f32,
    pub initial_use_eye_tracking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRegionsSettings {
    pub enabled: bool,
    pub symmetric_projection: bool,
    pub optimization_mode: RenderRegionsMode,
    /// Boolean predecessor of `optimization_mode`.
    pub legacy_optimize_multiview_render_regions: bool,
    pub migrated_multiview_render_regions: bool,
}

impl RenderRegionsSettings {
    /// One-time migration from the legacy boolean to the mode enum.
    pub fn migrate_legacy_mode(&mut self) {
        if self.migrated_multiview_render_regions {
            return;
        }
        self.optimization_mode = if self.legacy_optimize_multiview_render_regions {
            RenderRegionsMode::FinalPass
        } else {
            RenderRegionsMode::None
        };
        self.migrated_multiview_render_regions = true;
    }

    /// Keeps the legacy boolean in step before saving.
    pub fn sync_legacy_flag(&mut self) {
        self.legacy_optimize_multiview_render_regions =
            self.optimization_mode != RenderRegionsMode::None;
    }
}

/// Settings load/save errors.
#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "settings file `{}` is not accessible: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "settings JSON is invalid: {err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}
