use framexr_core::build::hooks::{
    FRAGMENT_DENSITY_MAP_KEY, LATE_LATCHING_DEBUG_KEY, LATE_LATCHING_ENABLED_KEY,
    MVPVV_ENABLED_KEY,
};
use framexr_core::build::pipeline::{ANDROID_MANIFEST_FILE_NAME, BOOT_CONFIG_FILE_NAME};
use framexr_core::settings::{RenderMode, RenderRegionsMode};
use framexr_core::validation::is_buildable;
use framexr_core::{
    apply_automatic_fixes, validate, BuildError, BuildOutputs, BuildPipeline, BuildTarget,
    ProjectSettings,
};

const EYE_TRACKING_FEATURE: &str = "oculus.software.eye_tracking";

fn android_ready_settings() -> ProjectSettings {
    let mut settings = ProjectSettings::default();
    settings.player.force_vulkan();
    settings.features.support.enabled = true;
    settings.features.support.late_latching_mode = true;
    settings.features.foveated_rendering.enabled = true;
    settings.features.engine_foveated_rendering.enabled = true;
    settings
}

#[test]
fn android_build_writes_boot_config_and_manifest() {
    let mut settings = android_ready_settings();
    let mut outputs = BuildOutputs::default();
    let report = BuildPipeline::new()
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("build");

    assert_eq!(report.features_run.len(), 2);
    assert_eq!(outputs.boot_config.get(LATE_LATCHING_ENABLED_KEY), Some("1"));
    assert_eq!(outputs.boot_config.get(LATE_LATCHING_DEBUG_KEY), Some("0"));
    assert_eq!(outputs.boot_config.get(FRAGMENT_DENSITY_MAP_KEY), Some("1"));
    assert_eq!(report.manifest_added, 4);

    let xml = outputs.manifest.to_xml();
    assert!(xml.contains("android:name=\"oculus.software.eye_tracking\""));
    assert!(xml.contains("android:name=\"android.permission.EYE_TRACKING_FINE\""));
}

#[test]
fn repeated_builds_do_not_duplicate_manifest_entries() {
    let mut settings = android_ready_settings();
    let mut outputs = BuildOutputs::default();
    let pipeline = BuildPipeline::new();

    pipeline
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("first build");
    let second = pipeline
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("second build");

    assert_eq!(second.manifest_added, 0);
    let features = outputs.manifest.find(
        &["manifest", "uses-feature"],
        &[("name", EYE_TRACKING_FEATURE)],
    );
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].attribute("required"), Some("true"));
}

#[test]
fn standalone_build_skips_manifest() {
    let mut settings = android_ready_settings();
    let mut outputs = BuildOutputs::default();
    let report = BuildPipeline::new()
        .run(&mut settings, BuildTarget::Standalone, &mut outputs)
        .expect("build");

    assert_eq!(report.manifest_added, 0);
    assert!(outputs
        .manifest
        .find(&["manifest", "uses-feature"], &[])
        .is_empty());
    assert_eq!(outputs.boot_config.get(FRAGMENT_DENSITY_MAP_KEY), Some("1"));
}

#[test]
fn render_regions_mode_reaches_boot_config_and_openxr_settings() {
    let mut settings = ProjectSettings::default();
    settings.player.force_vulkan();
    let regions = &mut settings.features.render_regions;
    regions.enabled = true;
    regions.migrated_multiview_render_regions = true;
    regions.symmetric_projection = true;
    regions.optimization_mode = RenderRegionsMode::FinalPass;
    settings.openxr.render_mode = RenderMode::SinglePassInstanced;

    let mut outputs = BuildOutputs::default();
    BuildPipeline::new()
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("build");

    assert_eq!(outputs.boot_config.get(MVPVV_ENABLED_KEY), Some("1"));
    assert!(settings.openxr.symmetric_projection);
    assert_eq!(
        settings.openxr.multiview_render_regions_optimization_mode,
        RenderRegionsMode::FinalPass
    );
}

#[test]
fn unmigrated_render_regions_agree_between_boot_config_and_openxr_settings() {
    for (legacy_flag, expected) in [
        (false, RenderRegionsMode::None),
        (true, RenderRegionsMode::FinalPass),
    ] {
        let mut settings = ProjectSettings::default();
        settings.player.force_vulkan();
        let regions = &mut settings.features.render_regions;
        regions.enabled = true;
        regions.symmetric_projection = true;
        regions.optimization_mode = RenderRegionsMode::FinalPass;
        regions.legacy_optimize_multiview_render_regions = legacy_flag;
        settings.openxr.render_mode = RenderMode::SinglePassInstanced;

        let mut outputs = BuildOutputs::default();
        BuildPipeline::new()
            .run(&mut settings, BuildTarget::Android, &mut outputs)
            .expect("build");

        let raw = expected.as_raw().to_string();
        assert_eq!(outputs.boot_config.get(MVPVV_ENABLED_KEY), Some(raw.as_str()));
        assert_eq!(
            settings.openxr.multiview_render_regions_optimization_mode,
            expected
        );
        assert_eq!(settings.features.render_regions.optimization_mode, expected);
        assert!(settings.features.render_regions.migrated_multiview_render_regions);
    }
}

#[test]
fn automatic_fixes_unblock_a_failing_build() {
    let mut settings = ProjectSettings::default();
    settings.features.foveated_rendering.enabled = true;
    settings.features.validation.enabled = true;
    settings.player.android_target_architectures =
        vec![framexr_core::settings::AndroidArchitecture::Arm64];

    let mut outputs = BuildOutputs::default();
    let blocked = BuildPipeline::new().run(&mut settings, BuildTarget::Android, &mut outputs);
    assert!(matches!(blocked, Err(BuildError::Validation(_))));

    let fixed = apply_automatic_fixes(&mut settings, BuildTarget::Android);
    assert_eq!(fixed, 2);
    assert!(is_buildable(&validate(&settings, BuildTarget::Android)));
    BuildPipeline::new()
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("build after fixes");
}

#[test]
fn outputs_land_in_the_target_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = android_ready_settings();
    let mut outputs = BuildOutputs::default();
    BuildPipeline::new()
        .run(&mut settings, BuildTarget::Android, &mut outputs)
        .expect("build");

    let written = outputs
        .write_to(dir.path(), BuildTarget::Android)
        .expect("write outputs");
    assert_eq!(written.len(), 2);

    let boot_config =
        std::fs::read_to_string(dir.path().join(BOOT_CONFIG_FILE_NAME)).expect("boot.config");
    assert!(boot_config.contains("xr-latelatching-enabled=1\n"));
    let manifest = std::fs::read_to_string(dir.path().join(ANDROID_MANIFEST_FILE_NAME))
        .expect("manifest");
    assert!(manifest.starts_with("<?xml"));
    assert!(manifest.contains(EYE_TRACKING_FEATURE));
}
