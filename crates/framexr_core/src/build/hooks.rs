//! Per-feature build hooks.
//!
//! Each enabled feature may adjust project settings before a build, stamp
//! boot-config keys and request Android manifest elements. Hooks run in
//! ascending `callback_order`.

use crate::build::boot_config::{BootConfigBuilder, BootConfigError};
use crate::build::manifest::{ManifestElement, ManifestRequirement};
use crate::feature::render_regions::RenderRegionsFeature;
use crate::feature::{FOVEATED_RENDERING_FEATURE_ID, RENDER_REGIONS_FEATURE_ID, SUPPORT_FEATURE_ID};
use crate::settings::{BuildTarget, ProjectSettings};
use log::debug;

pub const LATE_LATCHING_ENABLED_KEY: &str = "xr-latelatching-enabled";
pub const LATE_LATCHING_DEBUG_KEY: &str = "xr-latelatchingdebug-enabled";
pub const FRAGMENT_DENSITY_MAP_KEY: &str = "xr-vulkan-extension-fragment-density-map-enabled";
pub const LEGACY_META_ENABLED_KEY: &str = "xr-meta-enabled";
pub const MVPVV_ENABLED_KEY: &str = "xr-mvpvv-enabled";
pub const OPENXR_LOADER: &str = "OpenXRLoader";

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

pub trait FeatureBuildHooks: Send + Sync {
    fn feature_id(&self) -> &'static str;

    fn callback_order(&self) -> i32;

    fn on_preprocess_build(&self, _settings: &mut ProjectSettings, _target: BuildTarget) {}

    fn on_process_boot_config(
        &self,
        _settings: &ProjectSettings,
        _target: BuildTarget,
        _builder: &mut BootConfigBuilder,
    ) -> Result<(), BootConfigError> {
        Ok(())
    }

    fn manifest_requirement(&self, _settings: &ProjectSettings) -> Option<ManifestRequirement> {
        None
    }
}

/// Late-latching switches.
#[derive(Debug, Default)]
pub struct SupportBuildHooks;

impl FeatureBuildHooks for SupportBuildHooks {
    fn feature_id(&self) -> &'static str {
        SUPPORT_FEATURE_ID
    }

    fn callback_order(&self) -> i32 {
        1
    }

    fn on_process_boot_config(
        &self,
        settings: &ProjectSettings,
        _target: BuildTarget,
        builder: &mut BootConfigBuilder,
    ) -> Result<(), BootConfigError> {
        let support = &settings.features.support;
        builder.set(LATE_LATCHING_ENABLED_KEY, flag(support.late_latching_mode))?;
        builder.set(LATE_LATCHING_DEBUG_KEY, flag(support.late_latching_debug))
    }
}

/// Fragment density map switch plus eye-tracking manifest entries.
#[derive(Debug, Default)]
pub struct FoveatedRenderingBuildHooks;

impl FeatureBuildHooks for FoveatedRenderingBuildHooks {
    fn feature_id(&self) -> &'static str {
        FOVEATED_RENDERING_FEATURE_ID
    }

    fn callback_order(&self) -> i32 {
        1
    }

    fn on_process_boot_config(
        &self,
        settings: &ProjectSettings,
        _target: BuildTarget,
        builder: &mut BootConfigBuilder,
    ) -> Result<(), BootConfigError> {
        let key = if settings.use_legacy_boot_config {
            LEGACY_META_ENABLED_KEY
        } else {
            FRAGMENT_DENSITY_MAP_KEY
        };
        builder.set(key, "1")
    }

    fn manifest_requirement(&self, _settings: &ProjectSettings) -> Option<ManifestRequirement> {
        let permission = |name: &str| {
            ManifestElement::new(&["manifest", "uses-permission"], &[("name", name)])
        };
        Some(ManifestRequirement {
            supported_xr_loaders: vec![OPENXR_LOADER.to_string()],
            new_elements: vec![
                ManifestElement::new(
                    &["manifest", "uses-feature"],
                    &[("name", "oculus.software.eye_tracking"), ("required", "true")],
                ),
                permission("com.oculus.permission.EYE_TRACKING"),
                permission("android.permission.EYE_TRACKING"),
                permission("android.permission.EYE_TRACKING_FINE"),
            ],
            remove_elements: Vec::new(),
        })
    }
}

/// Multiview render-regions mode; runs after the order-1 hooks.
#[derive(Debug, Default)]
pub struct RenderRegionsBuildHooks;

impl FeatureBuildHooks for RenderRegionsBuildHooks {
    fn feature_id(&self) -> &'static str {
        RENDER_REGIONS_FEATURE_ID
    }

    fn callback_order(&self) -> i32 {
        2
    }

    fn on_preprocess_build(&self, settings: &mut ProjectSettings, _target: BuildTarget) {
        settings.features.render_regions.migrate_legacy_mode();
        let feature = RenderRegionsFeature::new(settings.features.render_regions);
        feature.apply_settings_override(&mut settings.openxr);
    }

    fn on_process_boot_config(
        &self,
        settings: &ProjectSettings,
        target: BuildTarget,
        builder: &mut BootConfigBuilder,
    ) -> Result<(), BootConfigError> {
        if target != BuildTarget::Android {
            return Ok(());
        }
        if !settings.engine_version.at_least(6000, 1) {
            debug!(
                "event=render_regions_boot_config module=build status=skipped reason=engine_version"
            );
            return Ok(());
        }
        let mode = settings.features.render_regions.optimization_mode;
        builder.set(MVPVV_ENABLED_KEY, &mode.as_raw().to_string())
    }
}

/// Hooks for every feature of the package, in callback order.
pub fn package_build_hooks() -> Vec<Box<dyn FeatureBuildHooks>> {
    let mut hooks: Vec<Box<dyn FeatureBuildHooks>> = vec![
        Box::new(SupportBuildHooks),
        Box::new(FoveatedRenderingBuildHooks),
        Box::new(RenderRegionsBuildHooks),
    ];
    hooks.sort_by_key(|hook| hook.callback_order());
    hooks
}
