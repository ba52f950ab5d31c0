mod common;

use framexr_core::feature::extension::XR_META_FOVEATION_EYE_TRACKED;
use framexr_core::feature::Feature;
use framexr_core::settings::FoveationSettings;
use framexr_core::xr::functions::FOVEATION_EYE_TRACKED_STATE_VALID_BIT_META;
use framexr_core::xr::sys;
use framexr_core::{
    FoveationDisplay, FoveationFeature, FoveationLevel, LifecycleState, SessionState, XrCallError,
};
use std::sync::{Arc, Mutex};

const INSTANCE: u64 = 0x30;
const SESSION: u64 = 0x40;

#[derive(Debug, Default)]
struct DisplayState {
    level: Option<FoveationLevel>,
    dynamic: bool,
    eye_tracked: bool,
    offsets: Vec<f32>,
}

#[derive(Clone, Default)]
struct SharedDisplay(Arc<Mutex<DisplayState>>);

impl FoveationDisplay for SharedDisplay {
    fn set_foveation_level(
        &mut self,
        _session: sys::Session,
        level: FoveationLevel,
        vertical_offset: f32,
        dynamic: bool,
    ) {
        let mut state = self.0.lock().expect("display state");
        state.level = Some(level);
        state.dynamic = dynamic;
        state.offsets.push(vertical_offset);
    }

    fn foveation_level(&self) -> FoveationLevel {
        self.0
            .lock()
            .expect("display state")
            .level
            .unwrap_or(FoveationLevel::Off)
    }

    fn foveation_dynamic(&self) -> bool {
        self.0.lock().expect("display state").dynamic
    }

    fn set_eye_tracked(&mut self, _session: sys::Session, eye_tracked: bool) {
        self.0.lock().expect("display state").eye_tracked = eye_tracked;
    }

    fn eye_tracked(&self) -> bool {
        self.0.lock().expect("display state").eye_tracked
    }
}

fn feature_with_display(settings: FoveationSettings) -> (FoveationFeature, SharedDisplay) {
    let display = SharedDisplay::default();
    let feature = FoveationFeature::new(settings).with_display(Box::new(display.clone()));
    (feature, display)
}

fn begin(feature: &mut FoveationFeature, extensions: &[&str]) {
    let host = common::host(extensions);
    feature.on_instance_create(&host, sys::Instance::from_raw(INSTANCE));
    feature.on_session_create(sys::Session::from_raw(SESSION));
    feature.on_session_begin(&host, sys::Session::from_raw(SESSION));
}

#[test]
fn normalized_levels_map_to_buckets() {
    let (mut feature, display) = feature_with_display(FoveationSettings::default());
    begin(&mut feature, &[]);

    for (value, expected) in [
        (0.8, FoveationLevel::High),
        (0.5, FoveationLevel::Medium),
        (0.1, FoveationLevel::Low),
        (0.0, FoveationLevel::Off),
    ] {
        assert_eq!(feature.set_foveation_level(value).expect("set level"), expected);
        assert_eq!(display.foveation_level(), expected);
    }
    assert!(display
        .0
        .lock()
        .expect("display state")
        .offsets
        .iter()
        .all(|offset| *offset == 0.0));
}

#[test]
fn setting_a_level_keeps_the_dynamic_flag() {
    let (mut feature, display) = feature_with_display(FoveationSettings::default());
    begin(&mut feature, &[]);
    display.0.lock().expect("display state").dynamic = true;

    feature.set_foveation_level(0.5).expect("set level");
    assert!(display.foveation_dynamic());
    assert_eq!(feature.foveation_level(), 0.75);
}

#[test]
fn setters_need_a_session() {
    let (mut feature, _display) = feature_with_display(FoveationSettings::default());
    assert_eq!(
        feature.set_foveation_level(0.5),
        Err(XrCallError::NotInitialized("foveated_rendering"))
    );
    assert!(feature.set_eye_tracked_foveation(true).is_err());
    assert_eq!(feature.foveation_level(), 0.0);
}

#[test]
fn initial_settings_apply_on_visible_to_focused() {
    let settings = FoveationSettings {
        enabled: true,
        apply_settings_on_startup: true,
        initial_foveation_level: 0.9,
        initial_use_eye_tracking: true,
    };
    let (mut feature, display) = feature_with_display(settings);
    begin(&mut feature, &[]);

    feature.on_session_state_change(SessionState::Ready, SessionState::Synchronized);
    assert_eq!(display.0.lock().expect("display state").level, None);

    feature.on_session_state_change(SessionState::Visible, SessionState::Focused);
    assert_eq!(display.foveation_level(), FoveationLevel::High);
    assert!(feature.eye_tracked_foveation());
}

#[test]
fn eye_tracked_center_resolves_lazily() {
    let (mut feature, _display) = feature_with_display(FoveationSettings::default());
    begin(&mut feature, &[XR_META_FOVEATION_EYE_TRACKED]);
    assert_eq!(feature.core().state(), LifecycleState::Initialized);
    assert_eq!(common::lookups(), 0);

    let centers = feature
        .eye_tracked_center()
        .expect("eye tracked state")
        .expect("valid sample");
    assert_eq!(centers[0].x, common::EYE_CENTERS[0].0);
    assert_eq!(centers[1].x, common::EYE_CENTERS[1].0);
    assert_eq!(common::lookups(), 1);

    common::set_eye_state(0, sys::Result::SUCCESS);
    assert!(feature
        .eye_tracked_center()
        .expect("eye tracked state")
        .is_none());

    common::set_eye_state(FOVEATION_EYE_TRACKED_STATE_VALID_BIT_META | 0x10, sys::Result::SUCCESS);
    assert!(feature
        .eye_tracked_center()
        .expect("eye tracked state")
        .is_none());
    assert_eq!(common::lookups(), 1);
}

#[test]
fn eye_tracked_center_reports_missing_entry_point() {
    common::set_missing("xrGetFoveationEyeTrackedStateMETA");
    let (mut feature, _display) = feature_with_display(FoveationSettings::default());
    begin(&mut feature, &[XR_META_FOVEATION_EYE_TRACKED]);

    assert!(matches!(
        feature.eye_tracked_center(),
        Err(XrCallError::FunctionUnresolved("xrGetFoveationEyeTrackedStateMETA"))
    ));
    assert_eq!(feature.core().state(), LifecycleState::Initialized);
    assert_eq!(common::native_calls(), 0);
}

#[test]
fn eye_tracked_center_needs_the_extension() {
    let (mut feature, _display) = feature_with_display(FoveationSettings::default());
    begin(&mut feature, &[]);
    assert_eq!(feature.core().state(), LifecycleState::InstanceBound);
    assert!(matches!(
        feature.eye_tracked_center(),
        Err(XrCallError::NotInitialized("foveated_rendering"))
    ));
}
