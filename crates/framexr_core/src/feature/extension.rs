//! OpenXR extension strings declared by the features.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Extension the package's features request from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KnownExtension {
    DisplayRefreshRate,
    Foveation,
    FoveationConfiguration,
    FoveationVulkan,
    SwapchainUpdateState,
    FoveationEyeTracked,
    VulkanSwapchainCreateInfo,
    FrameControllerInteraction,
}

/// `XR_FB_display_refresh_rate`.
pub const XR_FB_DISPLAY_REFRESH_RATE: &str = "XR_FB_display_refresh_rate";
/// `XR_FB_foveation`.
pub const XR_FB_FOVEATION: &str = "XR_FB_foveation";
/// `XR_FB_foveation_configuration`.
pub const XR_FB_FOVEATION_CONFIGURATION: &str = "XR_FB_foveation_configuration";
/// `XR_FB_foveation_vulkan`.
pub const XR_FB_FOVEATION_VULKAN: &str = "XR_FB_foveation_vulkan";
/// `XR_FB_swapchain_update_state`.
pub const XR_FB_SWAPCHAIN_UPDATE_STATE: &str = "XR_FB_swapchain_update_state";
/// `XR_META_foveation_eye_tracked`.
pub const XR_META_FOVEATION_EYE_TRACKED: &str = "XR_META_foveation_eye_tracked";
/// `XR_META_vulkan_swapchain_create_info`.
pub const XR_META_VULKAN_SWAPCHAIN_CREATE_INFO: &str = "XR_META_vulkan_swapchain_create_info";
/// `XR_VALVE_frame_controller_interaction`.
pub const XR_VALVE_FRAME_CONTROLLER_INTERACTION: &str = "XR_VALVE_frame_controller_interaction";

const KNOWN_EXTENSIONS: &[KnownExtension] = &[
    KnownExtension::DisplayRefreshRate,
    KnownExtension::Foveation,
    KnownExtension::FoveationConfiguration,
    KnownExtension::FoveationVulkan,
    KnownExtension::SwapchainUpdateState,
    KnownExtension::FoveationEyeTracked,
    KnownExtension::VulkanSwapchainCreateInfo,
    KnownExtension::FrameControllerInteraction,
];

impl KnownExtension {
    pub fn all() -> &'static [KnownExtension] {
        KNOWN_EXTENSIONS
    }

    /// Registry name as passed to `xrCreateInstance`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisplayRefreshRate => XR_FB_DISPLAY_REFRESH_RATE,
            Self::Foveation => XR_FB_FOVEATION,
            Self::FoveationConfiguration => XR_FB_FOVEATION_CONFIGURATION,
            Self::FoveationVulkan => XR_FB_FOVEATION_VULKAN,
            Self::SwapchainUpdateState => XR_FB_SWAPCHAIN_UPDATE_STATE,
            Self::FoveationEyeTracked => XR_META_FOVEATION_EYE_TRACKED,
            Self::VulkanSwapchainCreateInfo => XR_META_VULKAN_SWAPCHAIN_CREATE_INFO,
            Self::FrameControllerInteraction => XR_VALVE_FRAME_CONTROLLER_INTERACTION,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DisplayRefreshRate => "Query, request and enumerate display refresh rates.",
            Self::Foveation => "Foveation profiles applied to swapchains.",
            Self::FoveationConfiguration => "Level and vertical offset for foveation profiles.",
            Self::FoveationVulkan => "Fragment density map images for Vulkan swapchains.",
            Self::SwapchainUpdateState => "Update swapchain state after creation.",
            Self::FoveationEyeTracked => "Gaze-driven foveation centres.",
            Self::VulkanSwapchainCreateInfo => "Extra Vulkan image create info for swapchains.",
            Self::FrameControllerInteraction => "Steam Frame controller interaction profile.",
        }
    }
}

impl Display for KnownExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one known extension from its registry name.
pub fn parse_known_extension(value: &str) -> Result<KnownExtension, ExtensionNameError> {
    let normalized = validate_extension_name(value)?;
    KNOWN_EXTENSIONS
        .iter()
        .copied()
        .find(|extension| extension.as_str() == normalized)
        .ok_or_else(|| ExtensionNameError::UnknownExtension(normalized.to_string()))
}

/// Checks the `XR_<AUTHOR>_<name>` grammar and returns the trimmed name.
///
/// The author tag is uppercase ASCII letters and digits; the name is
/// lowercase ASCII letters, digits and underscores.
pub fn validate_extension_name(value: &str) -> Result<&str, ExtensionNameError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(ExtensionNameError::EmptyExtension);
    }
    let invalid = || ExtensionNameError::InvalidExtension(normalized.to_string());

    let rest = normalized.strip_prefix("XR_").ok_or_else(invalid)?;
    let (author, name) = rest.split_once('_').ok_or_else(invalid)?;
    let author_ok = author
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && author
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    let name_ok = !name.is_empty()
        && !name.starts_with('_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !author_ok || !name_ok {
        return Err(invalid());
    }
    Ok(normalized)
}

/// Parses a whitespace-separated extension list, rejecting duplicates.
pub fn parse_extension_list(value: &str) -> Result<Vec<String>, ExtensionNameError> {
    let mut seen = BTreeSet::new();
    let mut extensions = Vec::new();
    for raw in value.split_whitespace() {
        let name = validate_extension_name(raw)?;
        if !seen.insert(name) {
            return Err(ExtensionNameError::DuplicateExtension(name.to_string()));
        }
        extensions.push(name.to_string());
    }
    Ok(extensions)
}

/// Extension string validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionNameError {
    EmptyExtension,
    InvalidExtension(String),
    DuplicateExtension(String),
    UnknownExtension(String),
}

impl Display for ExtensionNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyExtension => write!(f, "extension name must not be empty"),
            Self::InvalidExtension(value) => {
                write!(f, "extension name is invalid: {value} (expected XR_AUTHOR_name)")
            }
            Self::DuplicateExtension(value) => write!(f, "extension is duplicated: {value}"),
            Self::UnknownExtension(value) => write!(f, "extension is not used here: {value}"),
        }
    }
}

impl Error for ExtensionNameError {}

#[cfg(test)]
mod tests {
    use super::{
        parse_extension_list, parse_known_extension, validate_extension_name,
        ExtensionNameError, KnownExtension,
    };

    #[test]
    fn parses_every_known_extension() {
        for extension in KnownExtension::all() {
            assert_eq!(
                parse_known_extension(extension.as_str()).expect("known extension"),
                *extension
            );
            assert!(!extension.description().is_empty());
        }
    }

    #[test]
    fn accepts_registry_grammar() {
        assert!(validate_extension_name("XR_KHR_vulkan_enable2").is_ok());
        assert_eq!(
            validate_extension_name(" XR_FB_foveation ").expect("trimmed"),
            "XR_FB_foveation"
        );
    }

    #[test]
    fn rejects_malformed_names() {
        for value in ["xr_fb_foveation", "XR_fb_foveation", "XR_FB_", "XR_FB", "XR_FB_Foveation"] {
            let err = validate_extension_name(value).expect_err("malformed name must fail");
            assert!(matches!(err, ExtensionNameError::InvalidExtension(_)), "{value}");
        }
        assert_eq!(
            validate_extension_name("  ").unwrap_err(),
            ExtensionNameError::EmptyExtension
        );
    }

    #[test]
    fn rejects_unknown_but_well_formed_extension() {
        let err = parse_known_extension("XR_EXT_hand_tracking").unwrap_err();
        assert_eq!(
            err,
            ExtensionNameError::UnknownExtension("XR_EXT_hand_tracking".to_string())
        );
    }

    #[test]
    fn parses_lists_and_rejects_duplicates() {
        let list = parse_extension_list("XR_FB_foveation\n XR_FB_foveation_vulkan").expect("list");
        assert_eq!(list, vec!["XR_FB_foveation", "XR_FB_foveation_vulkan"]);
        assert!(parse_extension_list("").expect("empty list").is_empty());

        let err = parse_extension_list("XR_FB_foveation XR_FB_foveation").unwrap_err();
        assert_eq!(
            err,
            ExtensionNameError::DuplicateExtension("XR_FB_foveation".to_string())
        );
    }
}
