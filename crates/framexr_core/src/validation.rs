//! Project validation rules with fix-its.
//!
//! # Responsibility
//! - Describe the settings each enabled feature needs for a build target.
//! - Report violations and apply the fixes marked automatic.
//!
//! # Invariants
//! - Rules of disabled features never run.
//! - A rule whose precondition does not hold for the target or engine version
//!   passes.

use crate::feature::device_validation::HIGHEST_MIN_ANDROID_API_LEVEL;
use crate::feature::{
    DEVICE_VALIDATION_FEATURE_ID, FOVEATED_RENDERING_FEATURE_ID, RENDER_REGIONS_FEATURE_ID,
    SUPPORT_FEATURE_ID, SYSTEM_INFO_FEATURE_ID,
};
use crate::settings::{
    AndroidArchitecture, BuildTarget, GraphicsApi, ProjectSettings, RenderMode,
    RenderRegionsMode, ScriptingBackend,
};
use log::{info, warn};
use serde::Serialize;

type CheckFn = fn(&ProjectSettings, BuildTarget) -> bool;
type FixFn = fn(&mut ProjectSettings);

/// One check attached to a feature.
#[derive(Clone)]
pub struct ValidationRule {
    pub feature_id: &'static str,
    pub message: &'static str,
    pub help_text: Option<&'static str>,
    /// Errors block a build; warnings only inform.
    pub error: bool,
    /// Returns `true` when the settings pass.
    pub check: CheckFn,
    pub fix_it: Option<FixFn>,
    pub fix_it_automatic: bool,
    pub fix_it_message: Option<&'static str>,
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("feature_id", &self.feature_id)
            .field("message", &self.message)
            .field("error", &self.error)
            .field("fixable", &self.fix_it.is_some())
            .field("fix_it_automatic", &self.fix_it_automatic)
            .finish()
    }
}

/// A failed rule, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub feature_id: &'static str,
    pub message: &'static str,
    pub help_text: Option<&'static str>,
    pub error: bool,
    pub fixable: bool,
    pub fix_it_automatic: bool,
    pub fix_it_message: Option<&'static str>,
}

impl From<&ValidationRule> for ValidationIssue {
    fn from(rule: &ValidationRule) -> Self {
        Self {
            feature_id: rule.feature_id,
            message: rule.message,
            help_text: rule.help_text,
            error: rule.error,
            fixable: rule.fix_it.is_some(),
            fix_it_automatic: rule.fix_it_automatic,
            fix_it_message: rule.fix_it_message,
        }
    }
}

const SET_VULKAN: &str = "Set Vulkan as Graphics API";

fn explicit_vulkan_first(settings: &ProjectSettings) -> bool {
    settings.player.use_default_graphics_apis
        || settings.player.graphics_apis.first() == Some(&GraphicsApi::Vulkan)
}

fn render_regions_mode_active(settings: &ProjectSettings) -> bool {
    settings.engine_version.at_least(6000, 1)
        && settings.features.render_regions.optimization_mode != RenderRegionsMode::None
}

fn force_vulkan(settings: &mut ProjectSettings) {
    settings.player.force_vulkan();
}

fn force_single_pass_instanced(settings: &mut ProjectSettings) {
    settings.openxr.render_mode = RenderMode::SinglePassInstanced;
}

/// Every rule the package declares, in declaration order.
pub fn rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule {
            feature_id: SUPPORT_FEATURE_ID,
            message: "Late latching is only supported on Vulkan graphics API.",
            help_text: None,
            error: true,
            check: |settings, _| {
                let support = &settings.features.support;
                (!support.late_latching_mode && !support.late_latching_debug)
                    || settings.player.uses_vulkan(BuildTarget::Android)
            },
            fix_it: Some(force_vulkan),
            fix_it_automatic: true,
            fix_it_message: Some(SET_VULKAN),
        },
        ValidationRule {
            feature_id: FOVEATED_RENDERING_FEATURE_ID,
            message: "This feature is only supported on Vulkan graphics API.",
            help_text: None,
            error: true,
            check: |settings, _| explicit_vulkan_first(settings),
            fix_it: Some(force_vulkan),
            fix_it_automatic: true,
            fix_it_message: Some(SET_VULKAN),
        },
        ValidationRule {
            feature_id: FOVEATED_RENDERING_FEATURE_ID,
            message: "Unity Foveated Rendering feature must be enabled.",
            help_text: None,
            error: true,
            check: |settings, _| {
                !settings.engine_version.at_least(6000, 0)
                    || settings.features.engine_foveated_rendering.enabled
            },
            fix_it: Some(|settings| settings.features.engine_foveated_rendering.enabled = true),
            fix_it_automatic: true,
            fix_it_message: Some("Enable Unity's Foveated Rendering feature"),
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Multiview Render Regions Optimizations Mode requires symmetric projection setting turned on.",
            help_text: None,
            error: true,
            check: |settings, _| {
                !render_regions_mode_active(settings)
                    || settings.features.render_regions.symmetric_projection
            },
            fix_it: Some(|settings| settings.features.render_regions.symmetric_projection = true),
            fix_it_automatic: false,
            fix_it_message: None,
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Multiview Render Regions Optimizations Mode requires Render Mode set to \"Single Pass Instanced / Multi-view\".",
            help_text: None,
            error: true,
            check: |settings, _| {
                !render_regions_mode_active(settings)
                    || settings.openxr.render_mode == RenderMode::SinglePassInstanced
            },
            fix_it: Some(force_single_pass_instanced),
            fix_it_automatic: false,
            fix_it_message: None,
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Multiview Render Regions Optimizations Mode needs the Vulkan Graphics API to be the default Graphics API to work at runtime.",
            help_text: Some(
                "The Multiview Render Regions Optimizations Mode feature only works with the Vulkan Graphics API, \
                 which needs to be set as the first Graphics API to be loaded at application startup. \
                 Choosing other Graphics API may require to switch to Vulkan and restart the application.",
            ),
            error: false,
            check: |settings, _| {
                !render_regions_mode_active(settings)
                    || settings.player.uses_vulkan(BuildTarget::Android)
            },
            fix_it: None,
            fix_it_automatic: false,
            fix_it_message: None,
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Multiview Render Regions Optimizations - All Passes mode is only supported on Unity 6.2+ versions",
            help_text: None,
            error: true,
            check: |settings, _| {
                let version = settings.engine_version;
                if !version.at_least(6000, 1) || version.at_least(6000, 2) {
                    return true;
                }
                settings.openxr.multiview_render_regions_optimization_mode
                    != RenderRegionsMode::AllPasses
                    && settings.features.render_regions.optimization_mode
                        != RenderRegionsMode::AllPasses
            },
            fix_it: Some(|settings| {
                settings.features.render_regions.optimization_mode = RenderRegionsMode::FinalPass;
                settings.features.render_regions.sync_legacy_flag();
                if settings.openxr.multiview_render_regions_optimization_mode
                    == RenderRegionsMode::AllPasses
                {
                    settings.openxr.multiview_render_regions_optimization_mode =
                        RenderRegionsMode::FinalPass;
                }
            }),
            fix_it_automatic: true,
            fix_it_message: Some("Set Multiview Render Regions Optimization Mode to Final Pass."),
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Symmetric Projection is only supported on Vulkan graphics API",
            help_text: None,
            error: false,
            check: |settings, target| {
                target != BuildTarget::Android
                    || !settings.features.render_regions.symmetric_projection
                    || explicit_vulkan_first(settings)
            },
            fix_it: Some(force_vulkan),
            fix_it_automatic: true,
            fix_it_message: Some(SET_VULKAN),
        },
        ValidationRule {
            feature_id: RENDER_REGIONS_FEATURE_ID,
            message: "Symmetric Projection is only supported when using Multi-view",
            help_text: None,
            error: true,
            check: |settings, target| {
                target != BuildTarget::Android
                    || !settings.features.render_regions.symmetric_projection
                    || settings.openxr.render_mode == RenderMode::SinglePassInstanced
            },
            fix_it: Some(force_single_pass_instanced),
            fix_it_automatic: true,
            fix_it_message: Some("Set Render Mode to Multi-view"),
        },
        ValidationRule {
            feature_id: DEVICE_VALIDATION_FEATURE_ID,
            message: "Minimum supported Android API level must be <= 30.",
            help_text: None,
            error: true,
            check: |settings, target| {
                target != BuildTarget::Android
                    || settings.player.android_min_sdk_version <= HIGHEST_MIN_ANDROID_API_LEVEL
            },
            fix_it: Some(|settings| {
                settings.player.android_min_sdk_version = HIGHEST_MIN_ANDROID_API_LEVEL;
            }),
            fix_it_automatic: true,
            fix_it_message: Some("Open Project Settings to select a minimum API level."),
        },
        ValidationRule {
            feature_id: DEVICE_VALIDATION_FEATURE_ID,
            message: "Valve OpenXR on Android requires IL2CPP compatibility.",
            help_text: None,
            error: true,
            check: |settings, target| {
                target != BuildTarget::Android
                    || settings.player.scripting_backend == ScriptingBackend::Il2cpp
            },
            fix_it: Some(|settings| settings.player.scripting_backend = ScriptingBackend::Il2cpp),
            fix_it_automatic: true,
            fix_it_message: Some("Open Project Settings to set the scripting backend."),
        },
        ValidationRule {
            feature_id: DEVICE_VALIDATION_FEATURE_ID,
            message: "Valve OpenXR on Android requires ARM64 only",
            help_text: None,
            error: true,
            check: |settings, target| {
                target != BuildTarget::Android || settings.player.targets_arm64_only()
            },
            fix_it: Some(|settings| {
                settings.player.android_target_architectures = vec![AndroidArchitecture::Arm64];
            }),
            fix_it_automatic: false,
            fix_it_message: Some("Set target architecture to ARM64 only."),
        },
        ValidationRule {
            feature_id: DEVICE_VALIDATION_FEATURE_ID,
            message: "Valve OpenXR is not compatible with other built-in features for other XR platforms.",
            help_text: None,
            error: true,
            check: |settings, _| !settings.features.meta_quest_support.enabled,
            fix_it: Some(|settings| settings.features.meta_quest_support.enabled = false),
            fix_it_automatic: true,
            fix_it_message: Some("Disable incompatible features."),
        },
        ValidationRule {
            feature_id: SYSTEM_INFO_FEATURE_ID,
            message: "System info requires the Valve Utils support feature.",
            help_text: None,
            error: true,
            check: |settings, _| settings.features.support.enabled,
            fix_it: Some(|settings| settings.features.support.enabled = true),
            fix_it_automatic: true,
            fix_it_message: Some("Enable the support feature."),
        },
    ]
}

/// Runs the rules of every enabled feature against `settings`.
pub fn validate(settings: &ProjectSettings, target: BuildTarget) -> Vec<ValidationIssue> {
    let issues: Vec<ValidationIssue> = rules()
        .iter()
        .filter(|rule| settings.is_feature_enabled(rule.feature_id))
        .filter(|rule| !(rule.check)(settings, target))
        .map(ValidationIssue::from)
        .collect();
    let errors = issues.iter().filter(|issue| issue.error).count();
    if issues.is_empty() {
        info!(
            "event=validate module=validation status=ok target={}",
            target.as_str()
        );
    } else {
        warn!(
            "event=validate module=validation status=failed target={} errors={} warnings={}",
            target.as_str(),
            errors,
            issues.len() - errors
        );
    }
    issues
}

/// Applies automatic fixes for failing rules; returns how many were applied.
pub fn apply_automatic_fixes(settings: &mut ProjectSettings, target: BuildTarget) -> usize {
    let mut fixed = 0;
    for rule in rules() {
        if !rule.fix_it_automatic || !settings.is_feature_enabled(rule.feature_id) {
            continue;
        }
        let Some(fix_it) = rule.fix_it else {
            continue;
        };
        if (rule.check)(settings, target) {
            continue;
        }
        fix_it(settings);
        fixed += 1;
        info!(
            "event=validation_fix module=validation status=ok feature={} message={:?}",
            rule.feature_id, rule.message
        );
    }
    fixed
}

/// `true` when no failing rule is an error.
pub fn is_buildable(issues: &[ValidationIssue]) -> bool {
    !issues.iter().any(|issue| issue.error)
}
