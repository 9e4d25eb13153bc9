//! # Command Dispatch Module
//!
//! The boundary between the teleop core and the hardware-facing collaborators.
//!
//! - [`MotorCommand`]s go to the motor command channel, fire-and-forget.
//! - [`MotorStatus`] is the read-back the calibration machine uses to sequence
//!   velocity and offset commands.
//! - [`RoverCommand`]s go to the rover command publisher once per tick.
//!
//! [`link`] provides tokio channel-backed implementations of all three.

pub mod link;

use serde::{Deserialize, Serialize};

use crate::arbiter::ControlMode;
use crate::controller::bindings::Seat;
use crate::drive::DriveCommand;

pub use link::{ChannelPublisher, MotorCommandLink};

/// Motor-controller axis id. [`NO_AXIS`] means nothing is selected.
pub type AxisId = u8;

/// Sentinel axis id for "no axis selected".
pub const NO_AXIS: AxisId = 0xFF;

/// A hardware calibration command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MotorCommand {
    StartVelocity { axis: AxisId, velocity: f32 },
    UpdateVelocity { velocity: f32 },
    StopVelocity,
    Offset { axis: AxisId, offset: f32 },
    Confirm { axis: AxisId },
    Cancel { axis: AxisId },
    Stop { axis: AxisId },
    ReturnToOrigin { axis: AxisId },
}

/// Most recent command accepted by the motor command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastAction {
    #[default]
    None,
    Offset,
    VelocityStarted,
    VelocityStopped,
}

impl LastAction {
    /// Status implied by having just accepted `command`, if it changes the status.
    #[must_use]
    pub fn after(command: &MotorCommand) -> Option<LastAction> {
        match command {
            MotorCommand::StartVelocity { .. } => Some(LastAction::VelocityStarted),
            MotorCommand::StopVelocity => Some(LastAction::VelocityStopped),
            MotorCommand::Offset { .. } => Some(LastAction::Offset),
            _ => None,
        }
    }
}

/// Read-back status of the motor command channel.
#[cfg_attr(test, mockall::automock)]
pub trait MotorStatus {
    /// Most recent accepted command kind.
    fn last_action(&self) -> LastAction;

    /// Whether a velocity operation is running.
    fn is_velocity_running(&self) -> bool;
}

/// Sink for motor commands.
pub trait MotorChannel: MotorStatus {
    /// Enqueues a command without waiting for completion.
    fn send(&mut self, command: MotorCommand);
}

/// What the rover command publisher receives once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoverCommand {
    /// Operator seat that produced the command.
    pub seat: u8,
    pub drive: DriveCommand,
    pub mode: ControlMode,
}

impl RoverCommand {
    /// Creates a rover command for a seat.
    #[must_use]
    pub fn new(seat: Seat, drive: DriveCommand, mode: ControlMode) -> Self {
        Self {
            seat: seat.0,
            drive,
            mode,
        }
    }
}

/// Sink for rover commands.
pub trait RoverPublisher {
    /// Publishes one command.
    fn publish(&mut self, command: RoverCommand);
}
