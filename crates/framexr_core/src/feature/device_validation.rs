//! Android device validation feature.
//!
//! Carries no runtime behaviour; its checks live in `crate::validation`.

use crate::feature::descriptor::FeatureDescriptor;
use crate::feature::{Feature, DEVICE_VALIDATION_FEATURE_ID};
use crate::settings::BuildTarget;

/// Highest Android API level allowed as the minimum SDK.
pub const HIGHEST_MIN_ANDROID_API_LEVEL: u32 = 30;

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::new(
        DEVICE_VALIDATION_FEATURE_ID,
        "Valve Utils: Device Validation",
        "Validation checks for Android.",
        "0.1.0",
        &[],
        &[BuildTarget::Android],
    )
}

#[derive(Debug, Default)]
pub struct DeviceValidationFeature;

impl Feature for DeviceValidationFeature {
    fn id(&self) -> &'static str {
        DEVICE_VALIDATION_FEATURE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::{descriptor, DeviceValidationFeature};
    use crate::feature::{Feature, DEVICE_VALIDATION_FEATURE_ID};

    #[test]
    fn descriptor_targets_android_only() {
        let descriptor = descriptor();
        descriptor.validate().expect("validation descriptor");
        assert_eq!(descriptor.build_targets.len(), 1);
        assert_eq!(DeviceValidationFeature.id(), DEVICE_VALIDATION_FEATURE_ID);
    }
}
