//! Feature declaration and validation.

use crate::feature::extension::{validate_extension_name, ExtensionNameError};
use crate::settings::BuildTarget;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Company shown for every feature in this package.
pub const COMPANY: &str = "Valve Software";

pub const DOCUMENTATION_LINK: &str =
    "https://github.com/ValveSoftware/Unity/blob/main/com.valvesoftware.openxr.utils/Documentation~/index.md#open-xr-features";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    Feature,
    Interaction,
}

/// Declarative feature descriptor, shown by the host's feature list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    /// Stable feature identifier, e.g. `com.valve.openxr.refreshrate`.
    pub id: String,
    pub ui_name: String,
    pub company: String,
    pub description: String,
    pub documentation_link: String,
    /// Dotted numeric version (`1`, `0.1.0`).
    pub version: String,
    /// Extensions requested from the runtime when the feature is enabled.
    pub openxr_extensions: Vec<String>,
    pub build_targets: Vec<BuildTarget>,
    pub category: FeatureCategory,
}

impl FeatureDescriptor {
    /// Descriptor with the package defaults for company and documentation.
    pub fn new(
        id: &str,
        ui_name: &str,
        description: &str,
        version: &str,
        openxr_extensions: &[&str],
        build_targets: &[BuildTarget],
    ) -> Self {
        Self {
            id: id.to_string(),
            ui_name: ui_name.to_string(),
            company: COMPANY.to_string(),
            description: description.to_string(),
            documentation_link: DOCUMENTATION_LINK.to_string(),
            version: version.to_string(),
            openxr_extensions: openxr_extensions.iter().map(|e| e.to_string()).collect(),
            build_targets: build_targets.to_vec(),
            category: FeatureCategory::Feature,
        }
    }

    pub fn with_category(mut self, category: FeatureCategory) -> Self {
        self.category = category;
        self
    }

    /// Extensions joined with spaces, the form the runtime loader reads.
    pub fn extension_string(&self) -> String {
        self.openxr_extensions.join(" ")
    }

    pub fn supports_target(&self, target: BuildTarget) -> bool {
        self.build_targets.contains(&target)
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id.trim().is_empty() {
            return Err(DescriptorError::EmptyId);
        }
        if !is_valid_feature_id(self.id.trim()) {
            return Err(DescriptorError::InvalidId(self.id.clone()));
        }
        if self.ui_name.trim().is_empty() {
            return Err(DescriptorError::EmptyUiName);
        }

        if self.version.trim().is_empty() {
            return Err(DescriptorError::EmptyVersion);
        }
        if !is_dotted_numeric(self.version.trim()) {
            return Err(DescriptorError::InvalidVersion(self.version.clone()));
        }

        let mut dedup = BTreeSet::<&str>::new();
        for extension in &self.openxr_extensions {
            let normalized =
                validate_extension_name(extension).map_err(DescriptorError::InvalidExtension)?;
            if !dedup.insert(normalized) {
                return Err(DescriptorError::InvalidExtension(
                    ExtensionNameError::DuplicateExtension(normalized.to_string()),
                ));
            }
        }

        if self.build_targets.is_empty() {
            return Err(DescriptorError::MissingBuildTargets);
        }
        Ok(())
    }
}

fn is_valid_feature_id(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

/// One to three numeric components separated by dots.
fn is_dotted_numeric(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// Descriptor validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    EmptyId,
    InvalidId(String),
    EmptyUiName,
    EmptyVersion,
    InvalidVersion(String),
    InvalidExtension(ExtensionNameError),
    MissingBuildTargets,
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "feature id must not be empty"),
            Self::InvalidId(value) => write!(f, "feature id is invalid: {value}"),
            Self::EmptyUiName => write!(f, "feature UI name must not be empty"),
            Self::EmptyVersion => write!(f, "feature version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "feature version is invalid: {value} (expected dotted numeric version)"
            ),
            Self::InvalidExtension(err) => write!(f, "feature extension list is invalid: {err}"),
            Self::MissingBuildTargets => write!(f, "feature must declare at least one build target"),
        }
    }
}

impl Error for DescriptorError {}
