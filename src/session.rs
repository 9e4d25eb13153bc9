//! # Teleop Session
//!
//! Everything one operator seat drives: its strategy, arbiter and calibration
//! machine, wired in the order they must see each event.
//!
//! ## Drive gating
//!
//! The strategy runs every tick so toggled modes survive, but its output only
//! reaches the rover when:
//! - the control mode is `Rover`, and
//! - calibration operate mode is off.
//!
//! Otherwise the rover gets a neutral command in the strategy's current mode. A
//! confirmed estop overrides both and holds a neutral `EBrake` command until the
//! control mode changes.
//!
//! ## Calibration gating
//!
//! The calibration machine sits out an event when:
//! - the event confirmed an estop (only `StopVelocity` goes out),
//! - an estop is latched, or
//! - the estop binding is held, since the d-pad then selects control modes.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::arbiter::{ControlMode, ControlModeArbiter};
use crate::calibration::{AxisCalibration, CalibrationMemory};
use crate::controller::bindings::{Controller, Seat};
use crate::controller::input::{InputEvent, InputState};
use crate::dispatch::{MotorCommand, MotorStatus, RoverCommand};
use crate::drive::{DriveCommand, DriveContext, DriveStrategy, KinematicMode};

/// What one event produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionEffects {
    pub mode: ControlMode,
    pub mode_changed: bool,
    pub estop_confirmed: bool,
    /// Commands for the motor channel, in dispatch order.
    pub motor_commands: Vec<MotorCommand>,
}

/// One seat's teleop state.
#[derive(Debug, Clone)]
pub struct TeleopSession {
    seat: Seat,
    strategy: DriveStrategy,
    drive: DriveContext,
    arbiter: ControlModeArbiter,
    calibration: AxisCalibration,
    previous: DriveCommand,
    estop_latched: bool,
}

impl TeleopSession {
    #[must_use]
    pub fn new(
        seat: Seat,
        strategy: DriveStrategy,
        drive: DriveContext,
        arbiter: ControlModeArbiter,
        calibration: AxisCalibration,
    ) -> Self {
        Self {
            seat,
            strategy,
            drive,
            arbiter,
            calibration,
            previous: DriveCommand::default(),
            estop_latched: false,
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn mode(&self) -> ControlMode {
        self.arbiter.mode()
    }

    /// Whether a confirmed estop is holding the rover.
    pub fn estop_latched(&self) -> bool {
        self.estop_latched
    }

    /// The controllers this session reads, for the documentation export.
    pub fn controllers(&self) -> [&dyn Controller; 3] {
        [&self.strategy, &self.arbiter, &self.calibration]
    }

    /// Runs one input event through the arbiter, then the calibration machine.
    ///
    /// A confirmed estop stops any running calibration velocity and nothing else.
    pub fn handle_event<I, M>(
        &mut self,
        event: &InputEvent,
        input: &I,
        memory: &mut CalibrationMemory,
        motor: &M,
        now: Instant,
    ) -> SessionEffects
    where
        I: InputState + ?Sized,
        M: MotorStatus + ?Sized,
    {
        let outcome = self.arbiter.handle(event, input, now);

        if outcome.mode_changed && self.estop_latched {
            info!("Seat {}: estop released by mode change", self.seat.0);
            self.estop_latched = false;
        }

        let mut effects = SessionEffects {
            mode: outcome.mode,
            mode_changed: outcome.mode_changed,
            estop_confirmed: outcome.estop_confirmed,
            motor_commands: Vec::new(),
        };

        if outcome.estop_confirmed {
            error!("Seat {}: ESTOP confirmed", self.seat.0);
            self.estop_latched = true;
            if motor.is_velocity_running() {
                effects.motor_commands.push(MotorCommand::StopVelocity);
            }
            return effects;
        }

        if self.estop_latched || self.arbiter.estop_held(input) {
            return effects;
        }

        effects.motor_commands = self.calibration.handle(event, input, memory, motor);
        effects
    }

    /// Commands that settle the motor after this seat's gamepad disappeared.
    ///
    /// Call once the seat's input layer has been reset.
    pub fn input_lost<M: MotorStatus + ?Sized>(&self, motor: &M) -> Vec<MotorCommand> {
        if motor.is_velocity_running() {
            warn!("Seat {}: stopping calibration velocity after input loss", self.seat.0);
            vec![MotorCommand::StopVelocity]
        } else {
            Vec::new()
        }
    }

    /// Computes the rover command for this tick.
    ///
    /// Pass the event being processed, if any, so toggle-style mode bindings see
    /// their press edge.
    pub fn tick<I: InputState + ?Sized>(&mut self, event: Option<&InputEvent>, input: &I) -> RoverCommand {
        let command = self
            .strategy
            .compute_drive(event, input, &self.previous, &self.drive);
        self.previous = command;

        let mode = self.arbiter.mode();
        let drive = if self.estop_latched {
            DriveCommand::neutral(KinematicMode::EBrake)
        } else if mode != ControlMode::Rover || self.calibration.is_operating(input) {
            DriveCommand::neutral(command.mode)
        } else {
            command
        };

        RoverCommand::new(self.seat, drive, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::arbiter::DEFAULT_ESTOP_WINDOW;
    use crate::calibration::OperatePolicy;
    use evdev::{AbsoluteAxisType, EventType, InputEvent as DeviceEvent, Key};

    use crate::controller::input::InputSnapshot;
    use crate::controller::mapper::InputLayer;
    use crate::dispatch::{LastAction, MockMotorStatus};

    fn session(seat: Seat) -> TeleopSession {
        TeleopSession::new(
            seat,
            DriveStrategy::ModeSwitching,
            DriveContext::new(seat),
            ControlModeArbiter::new(seat, DEFAULT_ESTOP_WINDOW),
            AxisCalibration::new(seat, OperatePolicy::Toggle),
        )
    }

    fn motor(running: bool) -> MockMotorStatus {
        motor_with(LastAction::None, running)
    }

    fn motor_with(last_action: LastAction, running: bool) -> MockMotorStatus {
        let mut motor = MockMotorStatus::new();
        motor.expect_last_action().return_const(last_action);
        motor.expect_is_velocity_running().return_const(running);
        motor
    }

    fn calibrating_memory() -> CalibrationMemory {
        CalibrationMemory {
            panel_visible: true,
            offset_value: 2.5,
            velocity_value: 0.4,
            chosen_axis: 3,
            chosen_wheel: 2,
        }
    }

    /// Feeds one raw gamepad event the way the control loop does.
    fn feed(
        session: &mut TeleopSession,
        layer: &mut InputLayer,
        memory: &mut CalibrationMemory,
        motor: &MockMotorStatus,
        raw: DeviceEvent,
    ) -> Vec<MotorCommand> {
        let mut commands = Vec::new();
        for event in layer.process_event(&raw) {
            let effects = session.handle_event(&event, &*layer, memory, motor, Instant::now());
            commands.extend(effects.motor_commands);
            session.tick(Some(&event), &*layer);
        }
        commands
    }

    fn stick_x(value: i32) -> DeviceEvent {
        DeviceEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, value)
    }

    fn key(key: Key, value: i32) -> DeviceEvent {
        DeviceEvent::new(EventType::KEY, key.code(), value)
    }

    fn forward(session: &TeleopSession, value: f32) -> InputSnapshot {
        let b = &session.drive.bindings;
        let mut input = InputSnapshot::new();
        input.set_axis(&b.backward, &b.forward, value);
        input
    }

    fn estop(
        session: &mut TeleopSession,
        input: &mut InputSnapshot,
        memory: &mut CalibrationMemory,
        motor: &MockMotorStatus,
    ) -> SessionEffects {
        let t0 = Instant::now();
        input.set_held("estop", true);
        session.handle_event(&InputEvent::pressed("estop"), &*input, memory, motor, t0);
        input.set_held("estop", false);
        session.handle_event(
            &InputEvent::released("estop"),
            &*input,
            memory,
            motor,
            t0 + Duration::from_millis(300),
        )
    }

    // ==================== Drive Gating ====================

    #[test]
    fn test_rover_mode_passes_drive() {
        let mut s = session(Seat(0));
        let input = forward(&s, 0.7);
        let cmd = s.tick(None, &input);
        assert_eq!(cmd.mode, ControlMode::Rover);
        assert!((cmd.drive.linear.x - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_other_modes_neutralize_drive() {
        let mut s = session(Seat(0));
        let mut input = forward(&s, 0.7);
        let mut memory = CalibrationMemory::default();

        input.set_held("cycle_mode", true);
        let effects = s.handle_event(&InputEvent::pressed("cycle_mode"), &input, &mut memory, &motor(false), Instant::now());
        assert_eq!(effects.mode, ControlMode::Manipulator);

        let cmd = s.tick(None, &input);
        assert_eq!(cmd.mode, ControlMode::Manipulator);
        assert_eq!(cmd.drive.linear, crate::drive::Vector3::ZERO);
        assert_eq!(cmd.drive.mode, KinematicMode::Ackermann);
    }

    #[test]
    fn test_toggled_mode_survives_gating() {
        let mut s = session(Seat(0));
        let input = forward(&s, 0.5);
        let crab = InputEvent::pressed(s.drive.bindings.mode_crab.clone());
        s.tick(Some(&crab), &input);

        let cmd = s.tick(None, &input);
        assert_eq!(cmd.drive.mode, KinematicMode::Crab);
    }

    #[test]
    fn test_calibration_operate_neutralizes_drive() {
        let mut s = session(Seat(0));
        let input = forward(&s, 0.9);
        let mut memory = CalibrationMemory::default();

        s.handle_event(&InputEvent::pressed("calibration_mode"), &input, &mut memory, &motor(false), Instant::now());
        let cmd = s.tick(None, &input);
        assert_eq!(cmd.drive.linear.x, 0.0);

        s.handle_event(&InputEvent::pressed("calibration_mode"), &input, &mut memory, &motor(false), Instant::now());
        let cmd = s.tick(None, &input);
        assert!(cmd.drive.linear.x > 0.0);
    }

    // ==================== Estop ====================

    #[test]
    fn test_estop_latches_ebrake_until_mode_change() {
        let mut s = session(Seat(0));
        let mut input = forward(&s, 1.0);
        let m = motor(false);
        let mut memory = CalibrationMemory::default();

        let effects = estop(&mut s, &mut input, &mut memory, &m);
        assert!(effects.estop_confirmed);
        assert!(effects.motor_commands.is_empty());
        assert!(s.estop_latched());

        let cmd = s.tick(None, &input);
        assert_eq!(cmd.drive, DriveCommand::neutral(KinematicMode::EBrake));

        s.handle_event(&InputEvent::pressed("cycle_mode"), &input, &mut memory, &m, Instant::now());
        assert!(!s.estop_latched());
    }

    #[test]
    fn test_estop_stops_running_velocity() {
        let mut s = session(Seat(0));
        let mut input = InputSnapshot::new();
        let mut memory = CalibrationMemory::default();
        let effects = estop(&mut s, &mut input, &mut memory, &motor(true));
        assert_eq!(effects.motor_commands, vec![MotorCommand::StopVelocity]);
    }

    #[test]
    fn test_estop_with_bumper_held_only_stops() {
        let mut s = session(Seat(0));
        let mut input = InputSnapshot::new();
        let mut memory = calibrating_memory();
        let running = motor_with(LastAction::VelocityStarted, true);

        s.handle_event(&InputEvent::pressed("calibration_mode"), &input, &mut memory, &running, Instant::now());
        input.set_held("calibration_bumper_right", true);

        let effects = estop(&mut s, &mut input, &mut memory, &running);
        assert_eq!(effects.motor_commands, vec![MotorCommand::StopVelocity]);
    }

    #[test]
    fn test_latched_estop_silences_calibration() {
        let mut s = session(Seat(0));
        let mut input = InputSnapshot::new();
        let mut memory = calibrating_memory();
        let m = motor(false);

        s.handle_event(&InputEvent::pressed("calibration_mode"), &input, &mut memory, &m, Instant::now());
        estop(&mut s, &mut input, &mut memory, &m);
        assert!(s.estop_latched());

        input.set_held("calibration_dpad_left", true);
        let confirm = InputEvent::pressed("calibration_dpad_left");
        let effects = s.handle_event(&confirm, &input, &mut memory, &m, Instant::now());
        assert!(effects.motor_commands.is_empty());

        // A mode change releases the latch and calibration answers again
        s.handle_event(&InputEvent::pressed("cycle_mode"), &input, &mut memory, &m, Instant::now());
        let effects = s.handle_event(&confirm, &input, &mut memory, &m, Instant::now());
        assert_eq!(effects.motor_commands, vec![MotorCommand::Confirm { axis: 3 }]);
    }

    #[test]
    fn test_mode_select_hat_skips_calibration_dpad() {
        let mut s = session(Seat(0));
        let mut layer = InputLayer::new(Seat(0));
        let mut memory = calibrating_memory();
        let m = motor(false);

        feed(&mut s, &mut layer, &mut memory, &m, key(Key::BTN_SELECT, 1));
        feed(&mut s, &mut layer, &mut memory, &m, key(Key::BTN_SELECT, 0));
        feed(&mut s, &mut layer, &mut memory, &m, key(Key::BTN_MODE, 1));

        let hat_left = DeviceEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT0X.0, -1);
        let commands = feed(&mut s, &mut layer, &mut memory, &m, hat_left);
        assert!(commands.is_empty());
        assert_eq!(s.mode(), ControlMode::Autonomy);
    }

    // ==================== Input Loss ====================

    #[test]
    fn test_input_lost_stops_running_velocity() {
        let s = session(Seat(0));
        assert_eq!(s.input_lost(&motor(true)), vec![MotorCommand::StopVelocity]);
        assert!(s.input_lost(&motor(false)).is_empty());
    }

    // ==================== Gamepad To Calibration ====================

    #[test]
    fn test_stick_sweep_steps_wheel_through_input_layer() {
        let mut s = session(Seat(0));
        let mut layer = InputLayer::new(Seat(0));
        let mut memory = calibrating_memory();
        let m = motor(false);

        feed(&mut s, &mut layer, &mut memory, &m, key(Key::BTN_SELECT, 1));
        feed(&mut s, &mut layer, &mut memory, &m, key(Key::BTN_SELECT, 0));

        for raw in [160, 200, 230, 255] {
            feed(&mut s, &mut layer, &mut memory, &m, stick_x(raw));
        }
        assert_eq!(memory.chosen_wheel, 3);

        // Back to just outside the center deadzone: still guarded
        feed(&mut s, &mut layer, &mut memory, &m, stick_x(150));
        feed(&mut s, &mut layer, &mut memory, &m, stick_x(255));
        assert_eq!(memory.chosen_wheel, 3);

        // Inside the deadzone re-arms, the next full push steps again
        feed(&mut s, &mut layer, &mut memory, &m, stick_x(135));
        feed(&mut s, &mut layer, &mut memory, &m, stick_x(255));
        assert_eq!(memory.chosen_wheel, 0);
    }

    #[test]
    fn test_seats_are_independent() {
        let mut s = session(Seat(1));
        let mut memory = CalibrationMemory::default();
        let input = InputSnapshot::new();

        let effects = s.handle_event(&InputEvent::pressed("cycle_mode"), &input, &mut memory, &motor(false), Instant::now());
        assert_eq!(effects.mode, ControlMode::Rover);

        let effects = s.handle_event(&InputEvent::pressed("cycle_mode.1"), &input, &mut memory, &motor(false), Instant::now());
        assert_eq!(effects.mode, ControlMode::Manipulator);
        assert_eq!(s.tick(None, &input).seat, 1);
    }
}
