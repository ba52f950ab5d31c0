//! Feature registry and the package feature set.

use crate::feature::descriptor::{DescriptorError, FeatureDescriptor};
use crate::feature::{
    device_validation, foveation, refresh_rate, render_regions, support, system_info,
    DEVICE_VALIDATION_FEATURE_ID, FOVEATED_RENDERING_FEATURE_ID, REFRESH_RATE_FEATURE_ID,
    RENDER_REGIONS_FEATURE_ID, SUPPORT_FEATURE_ID,
};
use crate::input::controller_profile;
use crate::settings::{BuildTarget, ProjectSettings};
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const FEATURE_SET_ID: &str = "com.valvesoftware.openxr.utils.featureset";

/// Grouping the host shows as one toggleable set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSetDescriptor {
    pub id: &'static str,
    pub ui_name: &'static str,
    pub description: &'static str,
    pub build_targets: Vec<BuildTarget>,
    pub feature_ids: Vec<&'static str>,
    pub default_feature_ids: Vec<&'static str>,
}

/// The "Valve Utils" feature set. No feature is on by default.
pub fn valve_utils_feature_set() -> FeatureSetDescriptor {
    FeatureSetDescriptor {
        id: FEATURE_SET_ID,
        ui_name: "Valve Utils",
        description: "Collection of useful resource to assist with OpenXR development",
        build_targets: vec![BuildTarget::Android, BuildTarget::Standalone],
        feature_ids: vec![
            SUPPORT_FEATURE_ID,
            FOVEATED_RENDERING_FEATURE_ID,
            RENDER_REGIONS_FEATURE_ID,
            DEVICE_VALIDATION_FEATURE_ID,
            REFRESH_RATE_FEATURE_ID,
        ],
        default_feature_ids: Vec::new(),
    }
}

/// Registered descriptors indexed by id and by extension string.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    entries: BTreeMap<String, FeatureDescriptor>,
    order: Vec<String>,
    extension_index: BTreeMap<String, BTreeSet<String>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every feature this package ships.
    pub fn with_package_features() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in [
            support::descriptor(),
            foveation::descriptor(),
            render_regions::descriptor(),
            device_validation::descriptor(),
            refresh_rate::descriptor(),
            system_info::descriptor(),
            controller_profile::descriptor(),
        ] {
            registry.register(descriptor)?;
        }
        info!(
            "event=feature_registry_init module=feature status=ok features={}",
            registry.len()
        );
        Ok(registry)
    }

    /// Registers one descriptor after validation.
    pub fn register(&mut self, descriptor: FeatureDescriptor) -> Result<(), RegistryError> {
        descriptor
            .validate()
            .map_err(RegistryError::InvalidDescriptor)?;
        let id = descriptor.id.trim().to_string();
        if self.entries.contains_key(id.as_str()) {
            return Err(RegistryError::DuplicateFeatureId(id));
        }

        for extension in &descriptor.openxr_extensions {
            self.extension_index
                .entry(extension.trim().to_string())
                .or_default()
                .insert(id.clone());
        }
        self.order.push(id.clone());
        self.entries.insert(id, descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, feature_id: &str) -> Option<&FeatureDescriptor> {
        self.entries.get(feature_id)
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn list_by_extension(&self, extension: &str) -> Vec<&FeatureDescriptor> {
        let Some(ids) = self.extension_index.get(extension) else {
            return vec![];
        };
        ids.iter().filter_map(|id| self.entries.get(id)).collect()
    }

    /// Union of the extensions the enabled features request, in
    /// registration order without duplicates.
    pub fn required_extensions(&self, settings: &ProjectSettings) -> Vec<String> {
        let mut seen = BTreeSet::<&String>::new();
        self.iter()
            .filter(|descriptor| settings.is_feature_enabled(&descriptor.id))
            .flat_map(|descriptor| descriptor.openxr_extensions.iter())
            .filter(|extension| seen.insert(*extension))
            .cloned()
            .collect()
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidDescriptor(DescriptorError),
    DuplicateFeatureId(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDescriptor(err) => write!(f, "invalid feature descriptor: {err}"),
            Self::DuplicateFeatureId(value) => write!(f, "feature id already registered: {value}"),
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::{valve_utils_feature_set, FeatureRegistry, RegistryError};
    use crate::feature::{
        refresh_rate, FOVEATED_RENDERING_FEATURE_ID, REFRESH_RATE_FEATURE_ID,
        SYSTEM_INFO_FEATURE_ID,
    };
    use crate::settings::ProjectSettings;

    #[test]
    fn registers_every_package_feature() {
        let registry = FeatureRegistry::with_package_features().expect("package registry");
        assert_eq!(registry.len(), 7);
        let refresh = registry.get(REFRESH_RATE_FEATURE_ID).expect("refresh feature");
        assert_eq!(refresh.version, "1");
    }

    #[test]
    fn rejects_duplicate_feature_id() {
        let mut registry = FeatureRegistry::new();
        registry
            .register(refresh_rate::descriptor())
            .expect("first registration should succeed");
        let err = registry
            .register(refresh_rate::descriptor())
            .expect_err("duplicate registration must fail");
        assert!(matches!(err, RegistryError::DuplicateFeatureId(_)));
    }

    #[test]
    fn builds_extension_index() {
        let registry = FeatureRegistry::with_package_features().expect("package registry");
        let eye_tracked = registry.list_by_extension("XR_META_foveation_eye_tracked");
        assert_eq!(eye_tracked.len(), 1);
        assert_eq!(eye_tracked[0].id, FOVEATED_RENDERING_FEATURE_ID);
        assert!(registry.list_by_extension("XR_EXT_unused").is_empty());
    }

    #[test]
    fn required_extensions_follow_enabled_features() {
        let registry = FeatureRegistry::with_package_features().expect("package registry");
        let mut settings = ProjectSettings::default();
        assert!(registry.required_extensions(&settings).is_empty());

        settings.set_feature_enabled(REFRESH_RATE_FEATURE_ID, true);
        settings.set_feature_enabled(SYSTEM_INFO_FEATURE_ID, true);
        assert_eq!(
            registry.required_extensions(&settings),
            vec!["XR_FB_display_refresh_rate".to_string()]
        );

        settings.set_feature_enabled(FOVEATED_RENDERING_FEATURE_ID, true);
        assert_eq!(registry.required_extensions(&settings).len(), 7);
    }

    #[test]
    fn feature_set_lists_members_without_defaults() {
        let set = valve_utils_feature_set();
        assert_eq!(set.ui_name, "Valve Utils");
        assert_eq!(set.feature_ids.len(), 5);
        assert!(set.default_feature_ids.is_empty());
        let registry = FeatureRegistry::with_package_features().expect("package registry");
        assert!(set.feature_ids.iter().all(|id| registry.get(id).is_some()));
    }
}
