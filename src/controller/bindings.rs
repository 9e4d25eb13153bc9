//! # Action Binding Resolver
//!
//! Maps logical actions to the binding names the input layer recognises.
//!
//! Every operator seat shares the same binding table. A seat qualifies the base binding
//! name with a suffix so several gamepads can be attached at once:
//!
//! | Seat | Binding for [`Action::Estop`] |
//! |------|-------------------------------|
//! | 0 | `estop` |
//! | 1 | `estop.1` |
//! | 2 | `estop.2` |
//!
//! The table also records the default physical inputs for each action. Those defaults
//! drive [`super::mapper::InputLayer`] and the documentation export, never the control
//! path itself.
//!
//! ## Usage
//!
//! ```
//! use rover_teleop::controller::bindings::{resolve, Seat};
//!
//! assert_eq!(resolve("estop", Seat(0)).unwrap(), "estop");
//! assert_eq!(resolve("estop", Seat(1)).unwrap(), "estop.1");
//! assert!(resolve("warp_drive", Seat(0)).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use evdev::{AbsoluteAxisType, Key};

use crate::error::{Result, TeleopError};

/// An operator seat. Seat 0 is the primary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Seat(pub u8);

impl Seat {
    /// Suffix appended to every binding name of this seat.
    #[must_use]
    pub fn suffix(&self) -> String {
        if self.0 == 0 {
            String::new()
        } else {
            format!(".{}", self.0)
        }
    }

    /// Qualifies a base binding name for this seat.
    #[must_use]
    pub fn qualify(&self, base: &str) -> String {
        format!("{}{}", base, self.suffix())
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

/// Every logical action the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    // Drive
    DriveForward,
    DriveBackward,
    DriveLeft,
    DriveRight,
    StrafeUp,
    StrafeDown,
    ForcedSteerLeft,
    ForcedSteerRight,
    ModeAckermann,
    ModeCrab,
    ModeSpinner,
    ModeEBrake,

    // Control mode
    Estop,
    CycleMode,
    SelectRover,
    SelectManipulator,
    SelectSampler,
    SelectAutonomy,

    // Calibration
    CalibrationMode,
    CalibrationBack,
    CalibrationNext,
    CalibrationBumperLeft,
    CalibrationBumperRight,
    CalibrationOffsetLeft,
    CalibrationOffsetRight,
    CalibrationDpadTop,
    CalibrationDpadBottom,
    CalibrationDpadLeft,
    CalibrationDpadRight,
}

impl Action {
    /// All actions, in table order.
    pub const ALL: [Action; 29] = [
        Action::DriveForward,
        Action::DriveBackward,
        Action::DriveLeft,
        Action::DriveRight,
        Action::StrafeUp,
        Action::StrafeDown,
        Action::ForcedSteerLeft,
        Action::ForcedSteerRight,
        Action::ModeAckermann,
        Action::ModeCrab,
        Action::ModeSpinner,
        Action::ModeEBrake,
        Action::Estop,
        Action::CycleMode,
        Action::SelectRover,
        Action::SelectManipulator,
        Action::SelectSampler,
        Action::SelectAutonomy,
        Action::CalibrationMode,
        Action::CalibrationBack,
        Action::CalibrationNext,
        Action::CalibrationBumperLeft,
        Action::CalibrationBumperRight,
        Action::CalibrationOffsetLeft,
        Action::CalibrationOffsetRight,
        Action::CalibrationDpadTop,
        Action::CalibrationDpadBottom,
        Action::CalibrationDpadLeft,
        Action::CalibrationDpadRight,
    ];

    /// Logical name of the action, which is also its seat-0 binding name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Action::DriveForward => "drive_forward",
            Action::DriveBackward => "drive_backward",
            Action::DriveLeft => "drive_left",
            Action::DriveRight => "drive_right",
            Action::StrafeUp => "strafe_up",
            Action::StrafeDown => "strafe_down",
            Action::ForcedSteerLeft => "forced_steer_left",
            Action::ForcedSteerRight => "forced_steer_right",
            Action::ModeAckermann => "mode_ackermann",
            Action::ModeCrab => "mode_crab",
            Action::ModeSpinner => "mode_spinner",
            Action::ModeEBrake => "mode_ebrake",
            Action::Estop => "estop",
            Action::CycleMode => "cycle_mode",
            Action::SelectRover => "select_rover",
            Action::SelectManipulator => "select_manipulator",
            Action::SelectSampler => "select_sampler",
            Action::SelectAutonomy => "select_autonomy",
            Action::CalibrationMode => "calibration_mode",
            Action::CalibrationBack => "calibration_back",
            Action::CalibrationNext => "calibration_next",
            Action::CalibrationBumperLeft => "calibration_bumper_left",
            Action::CalibrationBumperRight => "calibration_bumper_right",
            Action::CalibrationOffsetLeft => "calibration_offset_left",
            Action::CalibrationOffsetRight => "calibration_offset_right",
            Action::CalibrationDpadTop => "calibration_dpad_top",
            Action::CalibrationDpadBottom => "calibration_dpad_bottom",
            Action::CalibrationDpadLeft => "calibration_dpad_left",
            Action::CalibrationDpadRight => "calibration_dpad_right",
        }
    }

    /// Looks an action up by its logical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| a.name() == name)
    }

    /// Default physical inputs bound to this action.
    #[must_use]
    pub fn defaults(&self) -> &'static [RawInput] {
        use RawInput::*;
        match self {
            Action::DriveForward => &[AxisNegative(AbsoluteAxisType::ABS_Y), Button(Key::KEY_W)],
            Action::DriveBackward => &[AxisPositive(AbsoluteAxisType::ABS_Y), Button(Key::KEY_S)],
            Action::DriveLeft => &[AxisNegative(AbsoluteAxisType::ABS_Z), Button(Key::KEY_A)],
            Action::DriveRight => &[AxisPositive(AbsoluteAxisType::ABS_Z), Button(Key::KEY_D)],
            Action::StrafeUp => &[AxisNegative(AbsoluteAxisType::ABS_RZ), Button(Key::KEY_R)],
            Action::StrafeDown => &[AxisPositive(AbsoluteAxisType::ABS_RZ), Button(Key::KEY_F)],
            Action::ForcedSteerLeft => &[Trigger(AbsoluteAxisType::ABS_RX)],
            Action::ForcedSteerRight => &[Trigger(AbsoluteAxisType::ABS_RY)],
            Action::ModeAckermann => &[Button(Key::BTN_NORTH), Button(Key::KEY_1)],
            Action::ModeCrab => &[Button(Key::BTN_WEST), Button(Key::KEY_2)],
            Action::ModeSpinner => &[Button(Key::BTN_EAST), Button(Key::KEY_3)],
            Action::ModeEBrake => &[Button(Key::BTN_SOUTH), Button(Key::KEY_4)],
            Action::Estop => &[Button(Key::BTN_MODE), Button(Key::KEY_ESC)],
            Action::CycleMode => &[Button(Key::BTN_START), Button(Key::KEY_TAB)],
            Action::SelectRover => &[AxisNegative(AbsoluteAxisType::ABS_HAT0Y)],
            Action::SelectManipulator => &[AxisPositive(AbsoluteAxisType::ABS_HAT0X)],
            Action::SelectSampler => &[AxisPositive(AbsoluteAxisType::ABS_HAT0Y)],
            Action::SelectAutonomy => &[AxisNegative(AbsoluteAxisType::ABS_HAT0X)],
            Action::CalibrationMode => &[Button(Key::BTN_SELECT), Button(Key::KEY_C)],
            Action::CalibrationBack => &[AxisNegative(AbsoluteAxisType::ABS_X)],
            Action::CalibrationNext => &[AxisPositive(AbsoluteAxisType::ABS_X)],
            Action::CalibrationBumperLeft => &[Button(Key::BTN_TL)],
            Action::CalibrationBumperRight => &[Button(Key::BTN_TR)],
            Action::CalibrationOffsetLeft => &[Button(Key::BTN_TL2)],
            Action::CalibrationOffsetRight => &[Button(Key::BTN_TR2)],
            Action::CalibrationDpadTop => &[AxisNegative(AbsoluteAxisType::ABS_HAT0Y)],
            Action::CalibrationDpadBottom => &[AxisPositive(AbsoluteAxisType::ABS_HAT0Y)],
            Action::CalibrationDpadLeft => &[AxisNegative(AbsoluteAxisType::ABS_HAT0X)],
            Action::CalibrationDpadRight => &[AxisPositive(AbsoluteAxisType::ABS_HAT0X)],
        }
    }
}

/// A physical input a binding can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    /// A key or button (0 released, 1 held).
    Button(Key),
    /// The negative half of a centred axis (stick or hat).
    AxisNegative(AbsoluteAxisType),
    /// The positive half of a centred axis (stick or hat).
    AxisPositive(AbsoluteAxisType),
    /// A one-sided analog trigger.
    Trigger(AbsoluteAxisType),
}

impl fmt::Display for RawInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawInput::Button(key) => write!(f, "{:?}", key),
            RawInput::AxisNegative(axis) => write!(f, "-{:?}", axis),
            RawInput::AxisPositive(axis) => write!(f, "+{:?}", axis),
            RawInput::Trigger(axis) => write!(f, "{:?}", axis),
        }
    }
}

/// Anything that consumes bindings and can describe itself for the documentation export.
pub trait Controller {
    /// Human-readable controller name.
    fn name(&self) -> &'static str;

    /// Logical actions this controller reads.
    fn actions(&self) -> &'static [Action];

    /// Free-text usage notes.
    fn usage_notes(&self) -> &'static str;
}

/// Resolves a logical action name for a seat.
///
/// # Errors
///
/// Returns [`TeleopError::UnknownAction`] if the name is not in the binding table.
pub fn resolve(logical_action: &str, seat: Seat) -> Result<String> {
    Action::from_name(logical_action)
        .map(|action| resolve_action(action, seat))
        .ok_or_else(|| TeleopError::UnknownAction(logical_action.to_string()))
}

/// Resolves a typed action for a seat.
#[must_use]
pub fn resolve_action(action: Action, seat: Seat) -> String {
    seat.qualify(action.name())
}

/// Lists every binding a controller consumes with its physical defaults.
#[must_use]
pub fn all_bindings_for(controller: &dyn Controller, seat: Seat) -> BTreeMap<String, Vec<RawInput>> {
    controller
        .actions()
        .iter()
        .map(|action| (resolve_action(*action, seat), action.defaults().to_vec()))
        .collect()
}
