//! Steam Frame controller interaction profile.
//!
//! # Responsibility
//! - Name every input path the profile exposes.
//! - Build the action map the host registers with the runtime.
//!
//! # Invariants
//! - Action names are unique within the map.
//! - A binding without user paths applies to every device in the map.
//!
//! # See also
//! - `XR_VALVE_frame_controller_interaction`

use crate::feature::descriptor::{FeatureCategory, FeatureDescriptor};
use crate::feature::extension::XR_VALVE_FRAME_CONTROLLER_INTERACTION;
use crate::feature::CONTROLLER_PROFILE_FEATURE_ID;
use crate::settings::BuildTarget;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const PROFILE: &str = "/interaction_profiles/valve/frame_controller";
pub const DEVICE_LOCALIZED_NAME: &str = "Steam Frame Controller OpenXR";

pub const USER_PATH_LEFT_HAND: &str = "/user/hand/left";
pub const USER_PATH_RIGHT_HAND: &str = "/user/hand/right";

// Left hand only.
pub const BUTTON_DPAD_UP: &str = "/input/dpad_up/click";
pub const BUTTON_DPAD_UP_TOUCH: &str = "/input/dpad_up/touch";
pub const BUTTON_DPAD_RIGHT: &str = "/input/dpad_right/click";
pub const BUTTON_DPAD_RIGHT_TOUCH: &str = "/input/dpad_right/touch";
pub const BUTTON_DPAD_DOWN: &str = "/input/dpad_down/click";
pub const BUTTON_DPAD_DOWN_TOUCH: &str = "/input/dpad_down/touch";
pub const BUTTON_DPAD_LEFT: &str = "/input/dpad_left/click";
pub const BUTTON_DPAD_LEFT_TOUCH: &str = "/input/dpad_left/touch";
pub const BUTTON_VIEW: &str = "/input/view/click";
pub const BUTTON_VIEW_TOUCH: &str = "/input/view/touch";

// Right hand only.
pub const BUTTON_A: &str = "/input/a/click";
pub const BUTTON_A_TOUCH: &str = "/input/a/touch";
pub const BUTTON_B: &str = "/input/b/click";
pub const BUTTON_B_TOUCH: &str = "/input/b/touch";
pub const BUTTON_X: &str = "/input/x/click";
pub const BUTTON_X_TOUCH: &str = "/input/x/touch";
pub const BUTTON_Y: &str = "/input/y/click";
pub const BUTTON_Y_TOUCH: &str = "/input/y/touch";
pub const MENU: &str = "/input/menu/click";
pub const MENU_TOUCH: &str = "/input/menu/touch";

// Both hands.
pub const SYSTEM: &str = "/input/system/click";
pub const SYSTEM_TOUCH: &str = "/input/system/touch";
pub const SQUEEZE_VALUE: &str = "/input/squeeze/value";
pub const SQUEEZE_CLICK: &str = "/input/squeeze/click";
pub const SQUEEZE_TOUCH: &str = "/input/squeeze/touch";
pub const BUMPER_CLICK: &str = "/input/bumper/click";
pub const BUMPER_TOUCH: &str = "/input/bumper/touch";
pub const TRIGGER: &str = "/input/trigger/value";
pub const TRIGGER_TOUCH: &str = "/input/trigger/touch";
pub const THUMBSTICK: &str = "/input/thumbstick";
pub const THUMBSTICK_CLICK: &str = "/input/thumbstick/click";
pub const THUMBSTICK_TOUCH: &str = "/input/thumbstick/touch";
pub const GRIP: &str = "/input/grip/pose";
pub const AIM: &str = "/input/aim/pose";
pub const HAPTIC: &str = "/output/haptic";

/// Host input-device characteristic bits.
pub mod characteristics {
    pub const HELD_IN_HAND: u32 = 1 << 2;
    pub const TRACKED_DEVICE: u32 = 1 << 5;
    pub const CONTROLLER: u32 = 1 << 6;
    pub const LEFT: u32 = 1 << 8;
    pub const RIGHT: u32 = 1 << 9;
}

pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor {
        company: "Valve".to_string(),
        documentation_link:
            "https://github.com/ValveSoftware/Unity/blob/main/com.valvesoftware.openxr.utils/Documentation~/index.md#interaction-profiles"
                .to_string(),
        ..FeatureDescriptor::new(
            CONTROLLER_PROFILE_FEATURE_ID,
            "Steam Frame Controller Profile",
            "Allows for mapping input to the Steam Frame Controller interaction profile.",
            "0.0.2",
            &[XR_VALVE_FRAME_CONTROLLER_INTERACTION],
            &[BuildTarget::Standalone, BuildTarget::Wsa, BuildTarget::Android],
        )
    }
    .with_category(FeatureCategory::Interaction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Binary,
    Axis1D,
    Axis2D,
    Pose,
    Vibrate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceConfig {
    pub characteristics: u32,
    pub user_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionBinding {
    pub interaction_path: &'static str,
    pub interaction_profile_name: &'static str,
    /// Devices this binding is limited to; empty means every device.
    pub user_paths: Vec<&'static str>,
}

impl ActionBinding {
    pub fn applies_to(&self, user_path: &str) -> bool {
        self.user_paths.is_empty() || self.user_paths.contains(&user_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionConfig {
    pub name: &'static str,
    pub localized_name: &'static str,
    pub action_type: ActionType,
    pub usages: Vec<&'static str>,
    pub bindings: Vec<ActionBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionMapConfig {
    pub name: &'static str,
    pub localized_name: &'static str,
    pub desired_interaction_profile: &'static str,
    pub manufacturer: &'static str,
    pub serial_number: &'static str,
    pub device_infos: Vec<DeviceConfig>,
    pub actions: Vec<ActionConfig>,
}

/// One resolved binding for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveBinding {
    pub action: &'static str,
    pub path: String,
}

impl ActionMapConfig {
    pub fn action(&self, name: &str) -> Option<&ActionConfig> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Full binding paths (`user path + input path`) for one device.
    pub fn bindings_for(&self, user_path: &str) -> Vec<EffectiveBinding> {
        self.actions
            .iter()
            .flat_map(|action| {
                action
                    .bindings
                    .iter()
                    .filter(|binding| binding.applies_to(user_path))
                    .map(move |binding| EffectiveBinding {
                        action: action.name,
                        path: format!("{user_path}{}", binding.interaction_path),
                    })
            })
            .collect()
    }

    /// Validates names, paths and device references.
    pub fn validate(&self) -> Result<(), ActionMapError> {
        if !self
            .desired_interaction_profile
            .starts_with("/interaction_profiles/")
        {
            return Err(ActionMapError::InvalidProfile(
                self.desired_interaction_profile.to_string(),
            ));
        }
        if self.device_infos.is_empty() {
            return Err(ActionMapError::MissingDevices);
        }
        let device_paths: BTreeSet<&str> = self
            .device_infos
            .iter()
            .map(|device| device.user_path)
            .collect();

        let mut names = BTreeSet::new();
        for action in &self.actions {
            if action.name.trim().is_empty() {
                return Err(ActionMapError::EmptyActionName);
            }
            if !names.insert(action.name) {
                return Err(ActionMapError::DuplicateAction(action.name.to_string()));
            }
            if action.bindings.is_empty() {
                return Err(ActionMapError::MissingBindings(action.name.to_string()));
            }
            for binding in &action.bindings {
                if !binding.interaction_path.starts_with("/input/")
                    && !binding.interaction_path.starts_with("/output/")
                {
                    return Err(ActionMapError::InvalidInteractionPath(
                        binding.interaction_path.to_string(),
                    ));
                }
                if binding.interaction_profile_name != self.desired_interaction_profile {
                    return Err(ActionMapError::ProfileMismatch(action.name.to_string()));
                }
                if let Some(unknown) = binding
                    .user_paths
                    .iter()
                    .find(|path| !device_paths.contains(*path))
                {
                    return Err(ActionMapError::UnknownUserPath(unknown.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn binding(interaction_path: &'static str) -> ActionBinding {
    ActionBinding {
        interaction_path,
        interaction_profile_name: PROFILE,
        user_paths: Vec::new(),
    }
}

fn hand_binding(interaction_path: &'static str, user_path: &'static str) -> ActionBinding {
    ActionBinding {
        user_paths: vec![user_path],
        ..binding(interaction_path)
    }
}

/// Right hand gets `right`, left hand gets `left`.
fn split_bindings(right: &'static str, left: &'static str) -> Vec<ActionBinding> {
    vec![
        hand_binding(right, USER_PATH_RIGHT_HAND),
        hand_binding(left, USER_PATH_LEFT_HAND),
    ]
}

fn action(
    name: &'static str,
    localized_name: &'static str,
    action_type: ActionType,
    usages: &[&'static str],
    bindings: Vec<ActionBinding>,
) -> ActionConfig {
    ActionConfig {
        name,
        localized_name,
        action_type,
        usages: usages.to_vec(),
        bindings,
    }
}

/// Action map registered for the Steam Frame controller.
pub fn action_map() -> ActionMapConfig {
    use characteristics::{CONTROLLER, HELD_IN_HAND, LEFT, RIGHT, TRACKED_DEVICE};
    use ActionType::{Axis1D, Axis2D, Binary, Pose, Vibrate};

    let hand = HELD_IN_HAND | TRACKED_DEVICE | CONTROLLER;
    ActionMapConfig {
        name: "steamframecontroller",
        localized_name: DEVICE_LOCALIZED_NAME,
        desired_interaction_profile: PROFILE,
        manufacturer: "Valve",
        serial_number: "",
        device_infos: vec![
            DeviceConfig {
                characteristics: hand | LEFT,
                user_path: USER_PATH_LEFT_HAND,
            },
            DeviceConfig {
                characteristics: hand | RIGHT,
                user_path: USER_PATH_RIGHT_HAND,
            },
        ],
        actions: vec![
            action("thumbstick", "Thumbstick", Axis2D, &["Primary2DAxis"], vec![binding(THUMBSTICK)]),
            action("grip", "Grip", Axis1D, &["Grip"], vec![binding(SQUEEZE_VALUE)]),
            action("gripPressed", "Grip Pressed", Binary, &["GripButton"], vec![binding(SQUEEZE_CLICK)]),
            action("gripTouched", "Grip Touched", Binary, &["GripButtonTouch"], vec![binding(SQUEEZE_TOUCH)]),
            action(
                "menu",
                "Menu",
                Binary,
                &["MenuButton", "ViewButton"],
                split_bindings(MENU, BUTTON_VIEW),
            ),
            // The left hand reports the view click, not the view touch.
            action(
                "menuTouched",
                "Menu Touched",
                Binary,
                &["MenuButtonTouch", "ViewButtonTouch"],
                split_bindings(MENU_TOUCH, BUTTON_VIEW),
            ),
            action(
                "faceButtonTop",
                "Face Button Top",
                Binary,
                &["FaceButtonTop", "YButton", "DpadUpButton"],
                split_bindings(BUTTON_Y, BUTTON_DPAD_UP),
            ),
            action(
                "faceButtonTopTouched",
                "Face Button Top Touched",
                Binary,
                &["FaceButtonTopTouch", "YButtonTouch", "DpadUpButtonTouch"],
                split_bindings(BUTTON_Y_TOUCH, BUTTON_DPAD_UP_TOUCH),
            ),
            action(
                "faceButtonOutside",
                "Face Button Outside",
                Binary,
                &["FaceButtonOutside", "BButton", "DpadLeftButton"],
                split_bindings(BUTTON_B, BUTTON_DPAD_LEFT),
            ),
            action(
                "faceButtonOutsideTouched",
                "Face Button Outside Touched",
                Binary,
                &["FaceButtonOutsideTouch", "BButtonTouch", "DpadLeftButtonTouch"],
                split_bindings(BUTTON_B_TOUCH, BUTTON_DPAD_LEFT_TOUCH),
            ),
            action(
                "faceButtonBottom",
                "Face Button Bottom",
                Binary,
                &["PrimaryButton", "FaceButtonBottom", "AButton", "DpadDownButton"],
                split_bindings(BUTTON_A, BUTTON_DPAD_DOWN),
            ),
            action(
                "faceButtonBottomTouched",
                "Face Button Bottom Touched",
                Binary,
                &["PrimaryButtonTouch", "FaceButtonBottomTouch", "AButtonTouch", "DpadDownButtonTouch"],
                split_bindings(BUTTON_A_TOUCH, BUTTON_DPAD_DOWN_TOUCH),
            ),
            action(
                "faceButtonInside",
                "Face Button Inside",
                Binary,
                &["SecondaryButton", "FaceButtonInside", "XButton", "DpadRightButton"],
                split_bindings(BUTTON_X, BUTTON_DPAD_RIGHT),
            ),
            action(
                "faceButtonInsideTouched",
                "Face Button Inside Touched",
                Binary,
                &["SecondaryButtonTouch", "FaceButtonInsideTouch", "XButtonTouch", "DpadRightButtonTouch"],
                split_bindings(BUTTON_X_TOUCH, BUTTON_DPAD_RIGHT_TOUCH),
            ),
            action("trigger", "Trigger", Axis1D, &["Trigger"], vec![binding(TRIGGER)]),
            action("triggerPressed", "Trigger Pressed", Binary, &["TriggerButton"], vec![binding(TRIGGER)]),
            action("triggerTouched", "Trigger Touched", Binary, &["TriggerTouch"], vec![binding(TRIGGER_TOUCH)]),
            action(
                "thumbstickClicked",
                "Thumbstick Clicked",
                Binary,
                &["Primary2DAxisClick"],
                vec![binding(THUMBSTICK_CLICK)],
            ),
            action(
                "thumbstickTouched",
                "Thumbstick Touched",
                Binary,
                &["Primary2DAxisTouch"],
                vec![binding(THUMBSTICK_TOUCH)],
            ),
            action("bumperButton", "Bumper Button", Binary, &["BumperButton"], vec![binding(BUMPER_CLICK)]),
            action("bumperTouched", "Bumper Touched", Binary, &["BumperTouch"], vec![binding(BUMPER_TOUCH)]),
            action("devicePose", "Device Pose", Pose, &["Device"], vec![binding(GRIP)]),
            action("pointer", "Pointer Pose", Pose, &["Pointer"], vec![binding(AIM)]),
            action("haptic", "Haptic Output", Vibrate, &["Haptic"], vec![binding(HAPTIC)]),
        ],
    }
}

/// Action map validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionMapError {
    InvalidProfile(String),
    MissingDevices,
    EmptyActionName,
    DuplicateAction(String),
    MissingBindings(String),
    InvalidInteractionPath(String),
    ProfileMismatch(String),
    UnknownUserPath(String),
}

impl Display for ActionMapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProfile(value) => write!(f, "interaction profile path is invalid: {value}"),
            Self::MissingDevices => write!(f, "action map must declare at least one device"),
            Self::EmptyActionName => write!(f, "action name must not be empty"),
            Self::DuplicateAction(value) => write!(f, "action is duplicated: {value}"),
            Self::MissingBindings(value) => write!(f, "action has no bindings: {value}"),
            Self::InvalidInteractionPath(value) => {
                write!(f, "interaction path is invalid: {value}")
            }
            Self::ProfileMismatch(value) => {
                write!(f, "action binds to a different interaction profile: {value}")
            }
            Self::UnknownUserPath(value) => write!(f, "binding names an unknown device: {value}"),
        }
    }
}

impl Error for ActionMapError {}

#[cfg(test)]
mod tests {
    use super::{
        action_map, characteristics, descriptor, ActionMapError, ActionType, BUTTON_VIEW, MENU,
        PROFILE, USER_PATH_LEFT_HAND, USER_PATH_RIGHT_HAND,
    };
    use crate::feature::descriptor::FeatureCategory;

    #[test]
    fn descriptor_is_an_interaction_feature() {
        let descriptor = descriptor();
        descriptor.validate().expect("controller profile descriptor");
        assert_eq!(descriptor.category, FeatureCategory::Interaction);
        assert_eq!(descriptor.company, "Valve");
        assert_eq!(
            descriptor.extension_string(),
            "XR_VALVE_frame_controller_interaction"
        );
    }

    #[test]
    fn action_map_is_valid_and_complete() {
        let map = action_map();
        map.validate().expect("action map");
        assert_eq!(map.actions.len(), 24);
        assert_eq!(map.desired_interaction_profile, PROFILE);
        assert_eq!(
            map.action("haptic").expect("haptic").action_type,
            ActionType::Vibrate
        );
    }

    #[test]
    fn devices_carry_hand_characteristics() {
        let map = action_map();
        let left = &map.device_infos[0];
        assert_eq!(left.user_path, USER_PATH_LEFT_HAND);
        assert_ne!(left.characteristics & characteristics::LEFT, 0);
        assert_eq!(left.characteristics & characteristics::RIGHT, 0);
        assert_ne!(left.characteristics & characteristics::CONTROLLER, 0);
    }

    #[test]
    fn split_actions_resolve_per_hand() {
        let map = action_map();
        let right = map.bindings_for(USER_PATH_RIGHT_HAND);
        let left = map.bindings_for(USER_PATH_LEFT_HAND);

        let menu_right: Vec<_> = right.iter().filter(|b| b.action == "menu").collect();
        assert_eq!(menu_right.len(), 1);
        assert_eq!(menu_right[0].path, format!("{USER_PATH_RIGHT_HAND}{MENU}"));

        let menu_left: Vec<_> = left.iter().filter(|b| b.action == "menu").collect();
        assert_eq!(menu_left[0].path, format!("{USER_PATH_LEFT_HAND}{BUTTON_VIEW}"));

        let touched_left: Vec<_> = left.iter().filter(|b| b.action == "menuTouched").collect();
        assert_eq!(touched_left[0].path, format!("{USER_PATH_LEFT_HAND}{BUTTON_VIEW}"));

        assert_eq!(right.len(), 24);
        assert_eq!(left.len(), 24);
    }

    #[test]
    fn rejects_duplicate_actions_and_unknown_devices() {
        let mut map = action_map();
        let duplicate = map.actions[0].clone();
        map.actions.push(duplicate);
        assert_eq!(
            map.validate().unwrap_err(),
            ActionMapError::DuplicateAction("thumbstick".to_string())
        );

        let mut map = action_map();
        map.actions[4].bindings[0].user_paths = vec!["/user/head"];
        assert_eq!(
            map.validate().unwrap_err(),
            ActionMapError::UnknownUserPath("/user/head".to_string())
        );
    }
}
