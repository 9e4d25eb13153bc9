//! # Drive Module
//!
//! Turns sampled stick values into [`DriveCommand`]s.
//!
//! A [`DriveStrategy`] is a closed set of interchangeable pure functions. The active
//! strategy is chosen by configuration and passed in explicitly on every call; no
//! strategy keeps hidden state, so identical input always produces an identical
//! command.
//!
//! | Strategy | Modes produced | Axes read |
//! |----------|----------------|-----------|
//! | `ModeSwitching` | Ackermann, Crab, Spinner, EBrake | forward/back, left/right, strafe up/down |
//! | `SpinnerOnly` | Spinner | forward/back |
//! | `EBrake` | EBrake | none |
//! | `LegacyWheel` | Compatibility | forward/back, left/right, forced steer |
//! | `LegacyStrafe` | Compatibility | forward/back, left/right, forced steer |
//!
//! Every component of every command lies in `-1.0..=1.0`.

mod kinematics;
mod legacy;

use serde::{Deserialize, Serialize};

use crate::controller::bindings::{resolve_action, Action, Controller, Seat};
use crate::controller::input::{InputEvent, InputState};

/// Smallest deadzone ever applied, so the neutral test is never zero-width.
pub const MIN_DEADZONE: f32 = 0.001;

/// Linear command vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// Forward (+) / backward (-).
    pub x: f32,
    /// Right (+) / left (-).
    pub y: f32,
    /// Up (+) / down (-).
    pub z: f32,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Clamps every component to `-1.0..=1.0`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-1.0, 1.0),
            y: self.y.clamp(-1.0, 1.0),
            z: self.z.clamp(-1.0, 1.0),
        }
    }
}

/// Drive geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KinematicMode {
    /// Car-like steering.
    #[default]
    Ackermann,
    /// All wheels parallel, with vertical strafe.
    Crab,
    /// Rotate in place.
    Spinner,
    /// Full stop. Carries a zero vector; braking itself is left to the drive firmware.
    EBrake,
    /// Fixed mode of the legacy strategies.
    Compatibility,
}

/// One drive command, produced per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    /// Linear demand.
    pub linear: Vector3,
    /// Selected geometry.
    pub mode: KinematicMode,
}

impl DriveCommand {
    /// Creates a command, clamping the linear demand.
    #[must_use]
    pub fn new(linear: Vector3, mode: KinematicMode) -> Self {
        Self {
            linear: linear.clamped(),
            mode,
        }
    }

    /// A zero-demand command in `mode`.
    #[must_use]
    pub fn neutral(mode: KinematicMode) -> Self {
        Self {
            linear: Vector3::ZERO,
            mode,
        }
    }
}

/// How mode bindings select the kinematic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePolicy {
    /// A press sets the mode; it stays until another mode binding is pressed.
    #[default]
    Toggle,
    /// Ackermann unless a mode binding is held.
    Hold,
}

/// Seat-qualified binding names read by the drive strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub strafe_up: String,
    pub strafe_down: String,
    pub forced_steer_left: String,
    pub forced_steer_right: String,
    pub mode_ackermann: String,
    pub mode_crab: String,
    pub mode_spinner: String,
    pub mode_ebrake: String,
}

impl DriveBindings {
    /// Resolves the drive bindings for a seat.
    #[must_use]
    pub fn for_seat(seat: Seat) -> Self {
        let r = |action| resolve_action(action, seat);
        Self {
            forward: r(Action::DriveForward),
            backward: r(Action::DriveBackward),
            left: r(Action::DriveLeft),
            right: r(Action::DriveRight),
            strafe_up: r(Action::StrafeUp),
            strafe_down: r(Action::StrafeDown),
            forced_steer_left: r(Action::ForcedSteerLeft),
            forced_steer_right: r(Action::ForcedSteerRight),
            mode_ackermann: r(Action::ModeAckermann),
            mode_crab: r(Action::ModeCrab),
            mode_spinner: r(Action::ModeSpinner),
            mode_ebrake: r(Action::ModeEBrake),
        }
    }
}

/// Everything a strategy needs besides the input itself.
#[derive(Debug, Clone)]
pub struct DriveContext {
    pub bindings: DriveBindings,
    /// Configured stick deadzone.
    pub deadzone: f32,
    /// Global speed modifier in `(0, 1]`; `None` when speed limiting is disabled.
    pub speed_modifier: Option<f32>,
    pub mode_policy: ModePolicy,
    /// Threshold above which the forced-steer axis overrides lateral demand.
    pub forced_steer_deadzone: f32,
}

impl DriveContext {
    /// Creates a context with the default tuning for a seat.
    #[must_use]
    pub fn new(seat: Seat) -> Self {
        Self {
            bindings: DriveBindings::for_seat(seat),
            deadzone: 0.1,
            speed_modifier: None,
            mode_policy: ModePolicy::Toggle,
            forced_steer_deadzone: 0.2,
        }
    }

    /// Deadzone actually applied.
    #[must_use]
    pub fn effective_deadzone(&self) -> f32 {
        self.deadzone.max(MIN_DEADZONE)
    }

    /// Speed modifier actually applied (1.0 when disabled).
    #[must_use]
    pub fn effective_speed(&self) -> f32 {
        self.speed_modifier
            .filter(|s| *s > 0.0)
            .map_or(1.0, |s| s.min(1.0))
    }

    /// Samples forward/back and left/right, applying the deadzone and speed modifier.
    ///
    /// The forward component is scaled first and re-checked against
    /// `deadzone * speed`, so the neutral band shrinks with the speed.
    pub(crate) fn planar<I: InputState + ?Sized>(&self, input: &I) -> (f32, f32) {
        let b = &self.bindings;
        let deadzone = self.effective_deadzone();
        let (forward, lateral) = input.vector(&b.backward, &b.forward, &b.left, &b.right, deadzone);

        let speed = self.effective_speed();
        let scaled = forward * speed;
        let forward = if scaled.abs() < deadzone * speed {
            0.0
        } else {
            scaled
        };
        (forward, lateral)
    }

    /// Samples strafe up/down with the deadzone applied.
    pub(crate) fn vertical<I: InputState + ?Sized>(&self, input: &I) -> f32 {
        let v = input.axis(&self.bindings.strafe_down, &self.bindings.strafe_up);
        if v.abs() < self.effective_deadzone() {
            0.0
        } else {
            v
        }
    }

    /// Forced-steer demand, if the axis is past its own deadzone.
    pub(crate) fn forced_steer<I: InputState + ?Sized>(&self, input: &I) -> Option<f32> {
        let v = input.axis(&self.bindings.forced_steer_left, &self.bindings.forced_steer_right);
        (v.abs() > self.forced_steer_deadzone).then_some(v)
    }
}

/// The interchangeable drive strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStrategy {
    /// Primary strategy: Ackermann, Crab, Spinner or EBrake by mode selection.
    #[default]
    ModeSwitching,
    /// Rotate in place only.
    #[serde(rename = "spinner")]
    SpinnerOnly,
    /// Always stopped.
    #[serde(rename = "ebrake")]
    EBrake,
    /// Legacy single-stick strategy with smooth racing-wheel turning.
    LegacyWheel,
    /// Legacy single-stick strategy with raw strafing.
    LegacyStrafe,
}

impl DriveStrategy {
    /// Computes the drive command for this tick.
    ///
    /// `event` is the discrete event being processed, if any; mode toggles only react
    /// to press edges.
    pub fn compute_drive<I: InputState + ?Sized>(
        &self,
        event: Option<&InputEvent>,
        input: &I,
        previous: &DriveCommand,
        ctx: &DriveContext,
    ) -> DriveCommand {
        let mode = self.select_mode(event, input, previous, ctx);
        let linear = match self {
            DriveStrategy::ModeSwitching => kinematics::linear_for_mode(mode, input, ctx),
            DriveStrategy::SpinnerOnly => kinematics::linear_for_mode(KinematicMode::Spinner, input, ctx),
            DriveStrategy::EBrake => Vector3::ZERO,
            DriveStrategy::LegacyWheel => legacy::wheel(input, ctx),
            DriveStrategy::LegacyStrafe => legacy::strafe(input, ctx),
        };
        DriveCommand::new(linear, mode)
    }

    /// Selects the kinematic mode for this tick.
    pub fn select_mode<I: InputState + ?Sized>(
        &self,
        event: Option<&InputEvent>,
        input: &I,
        previous: &DriveCommand,
        ctx: &DriveContext,
    ) -> KinematicMode {
        match self {
            DriveStrategy::ModeSwitching => kinematics::select_mode(event, input, previous, ctx),
            DriveStrategy::SpinnerOnly => KinematicMode::Spinner,
            DriveStrategy::EBrake => KinematicMode::EBrake,
            DriveStrategy::LegacyWheel | DriveStrategy::LegacyStrafe => KinematicMode::Compatibility,
        }
    }

    /// Whether the strategy reacts to mode bindings.
    #[must_use]
    pub fn supports_mode_switching(&self) -> bool {
        matches!(self, DriveStrategy::ModeSwitching)
    }
}

const MODE_SWITCHING_ACTIONS: &[Action] = &[
    Action::DriveForward,
    Action::DriveBackward,
    Action::DriveLeft,
    Action::DriveRight,
    Action::StrafeUp,
    Action::StrafeDown,
    Action::ModeAckermann,
    Action::ModeCrab,
    Action::ModeSpinner,
    Action::ModeEBrake,
];

const SPINNER_ACTIONS: &[Action] = &[Action::DriveForward, Action::DriveBackward];

const LEGACY_ACTIONS: &[Action] = &[
    Action::DriveForward,
    Action::DriveBackward,
    Action::DriveLeft,
    Action::DriveRight,
    Action::ForcedSteerLeft,
    Action::ForcedSteerRight,
];

impl Controller for DriveStrategy {
    fn name(&self) -> &'static str {
        match self {
            DriveStrategy::ModeSwitching => "Mode switching drive",
            DriveStrategy::SpinnerOnly => "Spinner drive",
            DriveStrategy::EBrake => "E-brake",
            DriveStrategy::LegacyWheel => "Legacy wheel drive",
            DriveStrategy::LegacyStrafe => "Legacy strafe drive",
        }
    }

    fn actions(&self) -> &'static [Action] {
        match self {
            DriveStrategy::ModeSwitching => MODE_SWITCHING_ACTIONS,
            DriveStrategy::SpinnerOnly => SPINNER_ACTIONS,
            DriveStrategy::EBrake => &[],
            DriveStrategy::LegacyWheel | DriveStrategy::LegacyStrafe => LEGACY_ACTIONS,
        }
    }

    fn usage_notes(&self) -> &'static str {
        match self {
            DriveStrategy::ModeSwitching => {
                "Left stick drives forward/back, right stick X steers. Face buttons pick \
                 Ackermann, Crab, Spinner or E-brake; in hold mode the rover falls back to \
                 Ackermann when released. Crab adds vertical strafe on right stick Y."
            }
            DriveStrategy::SpinnerOnly => "Left stick Y sets the rotate-in-place rate.",
            DriveStrategy::EBrake => "All demands are held at zero.",
            DriveStrategy::LegacyWheel => {
                "Single stick, racing-wheel feel: steering is capped and speed drops at \
                 full lock. Triggers force the steer direction."
            }
            DriveStrategy::LegacyStrafe => {
                "Single stick, raw strafing: the stick direction is the travel direction, \
                 attenuated towards sideways. Triggers force the lateral demand."
            }
        }
    }
}
