//! Runtime dispatcher for host lifecycle callbacks.
//!
//! # Responsibility
//! - Build the enabled features from project settings.
//! - Fan each host callback out to every enabled feature, support first.
//!
//! # Invariants
//! - Disabled features are never constructed, so they never see a callback.
//! - Instance creation succeeds only if every feature accepts it.

use crate::feature::device_validation::DeviceValidationFeature;
use crate::feature::foveation::{FoveationDisplay, FoveationFeature};
use crate::feature::refresh_rate::RefreshRateFeature;
use crate::feature::render_regions::RenderRegionsFeature;
use crate::feature::support::SupportFeature;
use crate::feature::system_info::SystemInfoFeature;
use crate::feature::Feature;
use crate::settings::ProjectSettings;
use crate::xr::host::XrHost;
use crate::xr::session::SessionState;
use log::{info, warn};
use openxr_sys as sys;

#[derive(Default)]
struct EnabledFeatures {
    support: Option<SupportFeature>,
    foveation: Option<FoveationFeature>,
    render_regions: Option<RenderRegionsFeature>,
    validation: Option<DeviceValidationFeature>,
    refresh_rate: Option<RefreshRateFeature>,
    system_info: Option<SystemInfoFeature>,
}

impl EnabledFeatures {
    fn from_settings(settings: &ProjectSettings) -> Self {
        let features = &settings.features;
        Self {
            support: features
                .support
                .enabled
                .then(|| SupportFeature::new(features.support)),
            foveation: features
                .foveated_rendering
                .enabled
                .then(|| FoveationFeature::new(features.foveated_rendering)),
            render_regions: features
                .render_regions
                .enabled
                .then(|| RenderRegionsFeature::new(features.render_regions)),
            validation: features.validation.enabled.then_some(DeviceValidationFeature),
            refresh_rate: features.refresh_rate.enabled.then(RefreshRateFeature::new),
            system_info: features
                .system_info
                .enabled
                .then(|| SystemInfoFeature::new(true)),
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Feature> {
        let support = self.support.as_mut().map(|f| f as &mut dyn Feature);
        let foveation = self.foveation.as_mut().map(|f| f as &mut dyn Feature);
        let render_regions = self.render_regions.as_mut().map(|f| f as &mut dyn Feature);
        let validation = self.validation.as_mut().map(|f| f as &mut dyn Feature);
        let refresh_rate = self.refresh_rate.as_mut().map(|f| f as &mut dyn Feature);
        let system_info = self.system_info.as_mut().map(|f| f as &mut dyn Feature);
        [
            support,
            foveation,
            render_regions,
            validation,
            refresh_rate,
            system_info,
        ]
        .into_iter()
        .flatten()
    }

    fn ids(&self) -> Vec<&'static str> {
        let mut ids = Vec::new();
        if let Some(feature) = &self.support {
            ids.push(feature.id());
        }
        if let Some(feature) = &self.foveation {
            ids.push(feature.id());
        }
        if let Some(feature) = &self.render_regions {
            ids.push(feature.id());
        }
        if let Some(feature) = &self.validation {
            ids.push(feature.id());
        }
        if let Some(feature) = &self.refresh_rate {
            ids.push(feature.id());
        }
        if let Some(feature) = &self.system_info {
            ids.push(feature.id());
        }
        ids
    }
}

/// Enabled features plus the host they run against.
pub struct FrameXrRuntime {
    host: Box<dyn XrHost + Send>,
    settings: ProjectSettings,
    features: EnabledFeatures,
    instance: Option<sys::Instance>,
    system: Option<sys::SystemId>,
    session: Option<sys::Session>,
    session_state: SessionState,
}

impl FrameXrRuntime {
    pub fn new(host: Box<dyn XrHost + Send>, settings: ProjectSettings) -> Self {
        let features = EnabledFeatures::from_settings(&settings);
        info!(
            "event=runtime_init module=runtime status=ok features={}",
            features.ids().join(",")
        );
        Self {
            host,
            settings,
            features,
            instance: None,
            system: None,
            session: None,
            session_state: SessionState::Unknown,
        }
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn host(&self) -> &dyn XrHost {
        self.host.as_ref()
    }

    pub fn enabled_features(&self) -> Vec<&'static str> {
        self.features.ids()
    }

    pub fn instance(&self) -> Option<sys::Instance> {
        self.instance
    }

    pub fn system(&self) -> Option<sys::SystemId> {
        self.system
    }

    pub fn session(&self) -> Option<sys::Session> {
        self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn on_instance_create(&mut self, instance: sys::Instance) -> bool {
        self.instance = Some(instance);
        let host = self.host.as_ref();
        let mut accepted = true;
        for feature in self.features.iter_mut() {
            if !feature.on_instance_create(host, instance) {
                warn!(
                    "event=runtime_instance_create module=runtime status=rejected feature={}",
                    feature.id()
                );
                accepted = false;
            }
        }
        accepted
    }

    pub fn on_instance_destroy(&mut self, instance: sys::Instance) {
        for feature in self.features.iter_mut() {
            feature.on_instance_destroy(instance);
        }
        self.instance = None;
        self.system = None;
        self.session = None;
        self.session_state = SessionState::Unknown;
    }

    pub fn on_system_change(&mut self, system: sys::SystemId) {
        self.system = Some(system);
        for feature in self.features.iter_mut() {
            feature.on_system_change(system);
        }
    }

    pub fn on_session_create(&mut self, session: sys::Session) {
        self.session = Some(session);
        for feature in self.features.iter_mut() {
            feature.on_session_create(session);
        }
    }

    pub fn on_session_begin(&mut self, session: sys::Session) {
        let host = self.host.as_ref();
        for feature in self.features.iter_mut() {
            feature.on_session_begin(host, session);
        }
    }

    pub fn on_session_state_change(&mut self, old: SessionState, new: SessionState) {
        self.session_state = new;
        for feature in self.features.iter_mut() {
            feature.on_session_state_change(old, new);
        }
    }

    pub fn on_session_end(&mut self, session: sys::Session) {
        for feature in self.features.iter_mut() {
            feature.on_session_end(session);
        }
    }

    pub fn on_session_destroy(&mut self, session: sys::Session) {
        for feature in self.features.iter_mut() {
            feature.on_session_destroy(session);
        }
        self.session = None;
        self.session_state = SessionState::Unknown;
    }

    pub fn support(&self) -> Option<&SupportFeature> {
        self.features.support.as_ref()
    }

    pub fn support_mut(&mut self) -> Option<&mut SupportFeature> {
        self.features.support.as_mut()
    }

    pub fn foveation(&self) -> Option<&FoveationFeature> {
        self.features.foveation.as_ref()
    }

    pub fn foveation_mut(&mut self) -> Option<&mut FoveationFeature> {
        self.features.foveation.as_mut()
    }

    /// Installs the host display backend on the foveation feature, if enabled.
    pub fn set_foveation_display(&mut self, display: Box<dyn FoveationDisplay>) -> bool {
        match self.features.foveation.as_mut() {
            Some(foveation) => {
                foveation.set_display(Some(display));
                true
            }
            None => false,
        }
    }

    pub fn render_regions(&self) -> Option<&RenderRegionsFeature> {
        self.features.render_regions.as_ref()
    }

    pub fn refresh_rate(&self) -> Option<&RefreshRateFeature> {
        self.features.refresh_rate.as_ref()
    }

    pub fn refresh_rate_mut(&mut self) -> Option<&mut RefreshRateFeature> {
        self.features.refresh_rate.as_mut()
    }

    pub fn system_info(&self) -> Option<&SystemInfoFeature> {
        self.features.system_info.as_ref()
    }
}
