mod common;

use framexr_core::feature::extension::XR_FB_DISPLAY_REFRESH_RATE;
use framexr_core::feature::support::HandleEvent;
use framexr_core::feature::{
    FOVEATED_RENDERING_FEATURE_ID, REFRESH_RATE_FEATURE_ID, SUPPORT_FEATURE_ID,
    SYSTEM_INFO_FEATURE_ID,
};
use framexr_core::xr::functions::GetDisplayRefreshRateFB;
use framexr_core::xr::result::SENTINEL_FAILURE_F32;
use framexr_core::xr::sys;
use framexr_core::{
    FoveationDisplay, FoveationLevel, FrameXrRuntime, LifecycleState, ProjectSettings,
    SessionState,
};
use std::sync::{Arc, Mutex};

const INSTANCE: u64 = 0x70;
const SYSTEM: u64 = 3;
const SESSION: u64 = 0x80;

fn runtime_with(ids: &[&str], extensions: &[&str]) -> FrameXrRuntime {
    let mut settings = ProjectSettings::default();
    for id in ids {
        assert!(settings.set_feature_enabled(id, true));
    }
    FrameXrRuntime::new(Box::new(common::host(extensions)), settings)
}

fn start(runtime: &mut FrameXrRuntime) {
    assert!(runtime.on_instance_create(sys::Instance::from_raw(INSTANCE)));
    runtime.on_system_change(sys::SystemId::from_raw(SYSTEM));
    runtime.on_session_create(sys::Session::from_raw(SESSION));
    runtime.on_session_begin(sys::Session::from_raw(SESSION));
}

struct RecordingDisplay {
    level: Arc<Mutex<FoveationLevel>>,
}

impl RecordingDisplay {
    fn new() -> Self {
        Self {
            level: Arc::new(Mutex::new(FoveationLevel::Off)),
        }
    }
}

impl FoveationDisplay for RecordingDisplay {
    fn set_foveation_level(&mut self, _: sys::Session, level: FoveationLevel, _: f32, _: bool) {
        *self.level.lock().expect("level") = level;
    }

    fn foveation_level(&self) -> FoveationLevel {
        *self.level.lock().expect("level")
    }

    fn foveation_dynamic(&self) -> bool {
        false
    }

    fn set_eye_tracked(&mut self, _: sys::Session, _: bool) {}

    fn eye_tracked(&self) -> bool {
        false
    }
}

#[test]
fn refresh_rate_is_served_through_the_runtime() {
    let mut runtime = runtime_with(&[REFRESH_RATE_FEATURE_ID], &[XR_FB_DISPLAY_REFRESH_RATE]);
    start(&mut runtime);

    let refresh = runtime.refresh_rate().expect("refresh rate enabled");
    assert_eq!(refresh.state(), LifecycleState::Initialized);
    assert_eq!(refresh.refresh_rate(), 90.0);
    assert_eq!(refresh.request_refresh_rate(72.0), 0);
    assert_eq!(common::current_rate(), 72.0);

    runtime.on_session_end(sys::Session::from_raw(SESSION));
    assert_eq!(
        runtime.refresh_rate().expect("refresh rate enabled").refresh_rate(),
        SENTINEL_FAILURE_F32
    );
}

#[test]
fn support_reports_handles_and_resolves_functions() {
    let mut runtime = runtime_with(&[SUPPORT_FEATURE_ID], &[]);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    runtime
        .support_mut()
        .expect("support enabled")
        .subscribe_handle_events(move |event| sink.lock().expect("events").push(*event));

    start(&mut runtime);
    let support = runtime.support().expect("support enabled");
    assert!(support.has_session());
    assert!(support
        .get_instance_proc_typed::<GetDisplayRefreshRateFB>()
        .is_some());
    assert!(support.get_instance_proc("xrDoesNotExist").is_none());

    runtime.on_session_destroy(sys::Session::from_raw(SESSION));
    runtime.on_instance_destroy(sys::Instance::from_raw(INSTANCE));
    assert_eq!(
        *events.lock().expect("events"),
        vec![
            HandleEvent::InstanceCreated(sys::Instance::from_raw(INSTANCE)),
            HandleEvent::SessionCreated(sys::Session::from_raw(SESSION)),
            HandleEvent::SessionDestroyed(sys::Session::from_raw(SESSION)),
            HandleEvent::InstanceDestroyed(sys::Instance::from_raw(INSTANCE)),
        ]
    );
}

#[test]
fn system_info_sees_the_system_change() {
    let mut runtime = runtime_with(&[SYSTEM_INFO_FEATURE_ID], &[]);
    assert_eq!(
        runtime.enabled_features(),
        vec![SUPPORT_FEATURE_ID, SYSTEM_INFO_FEATURE_ID]
    );
    start(&mut runtime);
    assert_eq!(runtime.system(), Some(sys::SystemId::from_raw(SYSTEM)));
    assert!(runtime
        .system_info()
        .expect("system info enabled")
        .is_running_on_steam_frame());
}

#[test]
fn foveation_display_applies_initial_level_on_focus() {
    let mut settings = ProjectSettings::default();
    settings.set_feature_enabled(FOVEATED_RENDERING_FEATURE_ID, true);
    settings.features.foveated_rendering.apply_settings_on_startup = true;
    settings.features.foveated_rendering.initial_foveation_level = 0.5;
    let mut runtime = FrameXrRuntime::new(Box::new(common::host(&[])), settings);

    let display = RecordingDisplay::new();
    let level = Arc::clone(&display.level);
    assert!(runtime.set_foveation_display(Box::new(display)));
    start(&mut runtime);

    runtime.on_session_state_change(SessionState::Visible, SessionState::Focused);
    assert_eq!(*level.lock().expect("level"), FoveationLevel::Medium);
    assert_eq!(runtime.session_state(), SessionState::Focused);
}
