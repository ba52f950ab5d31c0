//! Multiview render-regions configuration.
//!
//! Settings only; nothing is resolved at runtime. The build hooks stamp the
//! optimisation mode into the boot config and copy the settings into the
//! project's OpenXR settings before a build.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::{Feature, RENDER_REGIONS_FEATURE_ID};
use crate::settings::{BuildTarget, OpenXrSettings, RenderRegionsMode, RenderRegionsSettings};
use log::info;

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        RENDER_REGIONS_FEATURE_ID,
        "Valve Utils: Settings for Unity's Render Regions",
        "Configuration of Unity's Render Regions.",
        "0.1.0",
        &[],
        &[BuildTarget::Android],
    )
}

pub struct RenderRegionsFeature {
    settings: RenderRegionsSettings,
}

impl RenderRegionsFeature {
    pub fn new(mut settings: RenderRegionsSettings) -> Self {
        settings.migrate_legacy_mode();
        Self { settings }
    }

    pub fn settings(&self) -> &RenderRegionsSettings {
        &self.settings
    }

    pub fn optimization_mode(&self) -> RenderRegionsMode {
        self.settings.optimization_mode
    }

    /// Copies this feature's settings over the project OpenXR settings.
    pub fn apply_settings_override(&self, openxr: &mut OpenXrSettings) {
        openxr.symmetric_projection = self.settings.symmetric_projection;
        openxr.multiview_render_regions_optimization_mode = self.settings.optimization_mode;
        info!(
            "event=render_regions_override module=feature status=ok symmetric_projection={} mode={}",
            self.settings.symmetric_projection,
            self.settings.optimization_mode.as_raw()
        );
    }
}

impl Feature for RenderRegionsFeature {
    fn id(&self) -> &'static str {
        RENDER_REGIONS_FEATURE_ID
    }
}
