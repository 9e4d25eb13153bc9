//! # Axis Calibration Module
//!
//! Turns calibration inputs into motor-controller commands for the selected axis.
//!
//! Nothing is issued unless operate mode is active (latched or held, per
//! [`OperatePolicy`]) and the calibration panel is visible. Once through that gate,
//! every event runs four handlers in order:
//!
//! 1. **Selection**: a stick push past the select threshold steps the chosen wheel once.
//!    The stick has to come back inside the center deadzone before the next step.
//! 2. **Bumper velocity**: the bumper pair drives a continuous velocity command.
//! 3. **Trigger offset**: a trigger press applies the configured offset.
//! 4. **D-pad**: confirm, return to origin, stop and cancel.
//!
//! Selection runs first so a new wheel is in place before anything reads it.

pub mod memory;

use tracing::debug;

use crate::controller::bindings::{resolve_action, Action, Controller, Seat};
use crate::controller::input::{InputEvent, InputState};
use crate::dispatch::{AxisId, LastAction, MotorCommand, MotorStatus};

pub use memory::{CalibrationMemory, OperatePolicy, NO_WHEEL, WHEEL_COUNT};

/// Stick magnitude under which the selection guard re-arms.
pub const DEFAULT_CENTER_DEADZONE: f32 = 0.15;

/// Stick magnitude that steps the selection.
pub const DEFAULT_SELECT_THRESHOLD: f32 = 0.8;

const CALIBRATION_ACTIONS: &[Action] = &[
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

/// Calibration bindings resolved for one seat.
#[derive(Debug, Clone)]
pub struct CalibrationBindings {
    pub mode: String,
    pub back: String,
    pub next: String,
    pub bumper_left: String,
    pub bumper_right: String,
    pub offset_left: String,
    pub offset_right: String,
    pub dpad_top: String,
    pub dpad_bottom: String,
    pub dpad_left: String,
    pub dpad_right: String,
}

impl CalibrationBindings {
    /// Resolves the calibration bindings for a seat.
    #[must_use]
    pub fn for_seat(seat: Seat) -> Self {
        let r = |action| resolve_action(action, seat);
        Self {
            mode: r(Action::CalibrationMode),
            back: r(Action::CalibrationBack),
            next: r(Action::CalibrationNext),
            bumper_left: r(Action::CalibrationBumperLeft),
            bumper_right: r(Action::CalibrationBumperRight),
            offset_left: r(Action::CalibrationOffsetLeft),
            offset_right: r(Action::CalibrationOffsetRight),
            dpad_top: r(Action::CalibrationDpadTop),
            dpad_bottom: r(Action::CalibrationDpadBottom),
            dpad_left: r(Action::CalibrationDpadLeft),
            dpad_right: r(Action::CalibrationDpadRight),
        }
    }
}

/// Guards that live only as long as the machine.
#[derive(Debug, Clone, Copy, Default)]
struct RuntimeState {
    /// Set after a selection step, cleared when the stick recenters.
    action_triggered: bool,
    /// Bumper value seen on the previous velocity pass.
    last_bumper: f32,
}

/// Calibration state machine for one seat.
#[derive(Debug, Clone)]
pub struct AxisCalibration {
    bindings: CalibrationBindings,
    policy: OperatePolicy,
    center_deadzone: f32,
    select_threshold: f32,
    wheel_axes: Option<[AxisId; WHEEL_COUNT as usize]>,
    latched: bool,
    runtime: RuntimeState,
}

impl AxisCalibration {
    /// Creates a machine with the default thresholds.
    #[must_use]
    pub fn new(seat: Seat, policy: OperatePolicy) -> Self {
        Self {
            bindings: CalibrationBindings::for_seat(seat),
            policy,
            center_deadzone: DEFAULT_CENTER_DEADZONE,
            select_threshold: DEFAULT_SELECT_THRESHOLD,
            wheel_axes: None,
            latched: false,
            runtime: RuntimeState::default(),
        }
    }

    /// Overrides the selection thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, center_deadzone: f32, select_threshold: f32) -> Self {
        self.center_deadzone = center_deadzone;
        self.select_threshold = select_threshold;
        self
    }

    /// Makes wheel selection also retarget `chosen_axis`, indexed by wheel.
    #[must_use]
    pub fn with_wheel_axes(mut self, axes: [AxisId; WHEEL_COUNT as usize]) -> Self {
        self.wheel_axes = Some(axes);
        self
    }

    pub fn bindings(&self) -> &CalibrationBindings {
        &self.bindings
    }

    /// Whether operate mode is active, before the panel gate.
    pub fn is_operating<I: InputState + ?Sized>(&self, input: &I) -> bool {
        match self.policy {
            OperatePolicy::Toggle => self.latched,
            OperatePolicy::Hold => input.is_held(&self.bindings.mode),
        }
    }

    /// Processes one input event and returns the commands to dispatch, in order.
    pub fn handle<I, M>(
        &mut self,
        event: &InputEvent,
        input: &I,
        memory: &mut CalibrationMemory,
        motor: &M,
    ) -> Vec<MotorCommand>
    where
        I: InputState + ?Sized,
        M: MotorStatus + ?Sized,
    {
        if self.policy == OperatePolicy::Toggle && event.is_press_of(&self.bindings.mode) {
            self.latched = !self.latched;
            debug!("Calibration operate mode latched: {}", self.latched);
        }

        if !self.is_operating(input) || !memory.panel_visible {
            return Vec::new();
        }

        self.handle_selection(input, memory);

        let mut commands = Vec::new();
        commands.extend(self.handle_bumpers(input, memory, motor));
        commands.extend(self.handle_triggers(event, input, memory));
        commands.extend(self.handle_dpad(event, input, memory));
        commands
    }

    fn handle_selection<I: InputState + ?Sized>(&mut self, input: &I, memory: &mut CalibrationMemory) {
        let value = input.axis(&self.bindings.back, &self.bindings.next);

        if value.abs() < self.center_deadzone {
            self.runtime.action_triggered = false;
            return;
        }
        if self.runtime.action_triggered {
            return;
        }

        let back = value <= -self.select_threshold;
        let next = value >= self.select_threshold;
        let direction = match (back, next) {
            (true, false) => -1,
            (false, true) => 1,
            _ => return,
        };

        memory.chosen_wheel = memory.stepped_wheel(direction);
        if let Some(axes) = self.wheel_axes {
            memory.chosen_axis = axes[memory.chosen_wheel as usize];
        }
        self.runtime.action_triggered = true;
        debug!(
            "Calibration wheel {} selected (axis {})",
            memory.chosen_wheel, memory.chosen_axis
        );
    }

    fn handle_bumpers<I, M>(
        &mut self,
        input: &I,
        memory: &CalibrationMemory,
        motor: &M,
    ) -> Option<MotorCommand>
    where
        I: InputState + ?Sized,
        M: MotorStatus + ?Sized,
    {
        let b = &self.bindings;
        let value = input.axis(&b.bumper_left, &b.bumper_right);

        // Bumper that set the remembered direction is no longer held
        let last = self.runtime.last_bumper;
        if (last < 0.0 && !input.is_held(&b.bumper_left)) || (last > 0.0 && !input.is_held(&b.bumper_right)) {
            self.runtime.last_bumper = 0.0;
        }

        let interlocked = self.runtime.last_bumper != 0.0
            && matches!(
                motor.last_action(),
                LastAction::Offset | LastAction::VelocityStopped
            );
        if (value == 0.0 && !motor.is_velocity_running()) || interlocked {
            return None;
        }

        self.runtime.last_bumper = value;

        let Some(axis) = memory.axis() else {
            debug!("Velocity ignored, no axis selected");
            return None;
        };
        if memory.velocity_value == 0.0 {
            debug!("Velocity ignored, base velocity is zero");
            return None;
        }

        if value == 0.0 {
            return Some(MotorCommand::StopVelocity);
        }

        let velocity = memory.velocity_value.abs() * value.abs() * value.signum();
        if motor.is_velocity_running() {
            Some(MotorCommand::UpdateVelocity { velocity })
        } else {
            Some(MotorCommand::StartVelocity { axis, velocity })
        }
    }

    fn handle_triggers<I: InputState + ?Sized>(
        &self,
        event: &InputEvent,
        input: &I,
        memory: &CalibrationMemory,
    ) -> Option<MotorCommand> {
        let b = &self.bindings;
        if !event.is_press_of(&b.offset_left) && !event.is_press_of(&b.offset_right) {
            return None;
        }

        let left = input.is_held(&b.offset_left);
        let right = input.is_held(&b.offset_right);
        if left == right {
            return None;
        }

        let axis = memory.axis()?;
        if memory.offset_value == 0.0 {
            debug!("Offset ignored, offset magnitude is zero");
            return None;
        }

        let magnitude = memory.offset_value.abs();
        let offset = if left { -magnitude } else { magnitude };
        Some(MotorCommand::Offset { axis, offset })
    }

    fn handle_dpad<I: InputState + ?Sized>(
        &self,
        event: &InputEvent,
        input: &I,
        memory: &CalibrationMemory,
    ) -> Option<MotorCommand> {
        let b = &self.bindings;
        let directions: [(&str, fn(AxisId) -> MotorCommand); 4] = [
            (b.dpad_left.as_str(), |axis| MotorCommand::Confirm { axis }),
            (b.dpad_right.as_str(), |axis| MotorCommand::ReturnToOrigin { axis }),
            (b.dpad_top.as_str(), |axis| MotorCommand::Stop { axis }),
            (b.dpad_bottom.as_str(), |axis| MotorCommand::Cancel { axis }),
        ];

        if !directions.iter().any(|(binding, _)| event.is_press_of(binding)) {
            return None;
        }

        let mut held = directions.iter().filter(|(binding, _)| input.is_held(binding));
        let (Some((_, command)), None) = (held.next(), held.next()) else {
            debug!("D-pad ignored, ambiguous input");
            return None;
        };

        let axis = memory.axis()?;
        Some(command(axis))
    }
}

impl Controller for AxisCalibration {
    fn name(&self) -> &'static str {
        "Axis calibration"
    }

    fn actions(&self) -> &'static [Action] {
        CALIBRATION_ACTIONS
    }

    fn usage_notes(&self) -> &'static str {
        "Calibration only acts while its panel is open and operate mode is on. Push the \
         left stick fully left or right to pick a wheel. Bumpers run the axis at the \
         configured velocity, triggers apply the offset. D-pad: left confirm, right \
         return to origin, up stop, down cancel."
    }
}
