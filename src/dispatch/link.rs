//! Channel-backed command sinks.
//!
//! [`MotorCommandLink`] owns the motor status it reports. The status is updated in the
//! same call that enqueues a command, so a reader never sees a status that lags a
//! dispatched command. Hardware feedback can still overwrite it through
//! [`MotorCommandLink::apply_feedback`].

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{LastAction, MotorChannel, MotorCommand, MotorStatus, RoverCommand, RoverPublisher};

/// Motor command sink over an unbounded tokio channel.
#[derive(Debug)]
pub struct MotorCommandLink {
    tx: mpsc::UnboundedSender<MotorCommand>,
    last_action: LastAction,
    velocity_running: bool,
}

impl MotorCommandLink {
    /// Creates a link and the receiver the uplink task drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MotorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                last_action: LastAction::None,
                velocity_running: false,
            },
            rx,
        )
    }

    /// Overwrites the local status with what the hardware reported.
    pub fn apply_feedback(&mut self, last_action: LastAction, velocity_running: bool) {
        debug!(
            "Motor feedback: {:?}, velocity running: {}",
            last_action, velocity_running
        );
        self.last_action = last_action;
        self.velocity_running = velocity_running;
    }
}

impl MotorStatus for MotorCommandLink {
    fn last_action(&self) -> LastAction {
        self.last_action
    }

    fn is_velocity_running(&self) -> bool {
        self.velocity_running
    }
}

impl MotorChannel for MotorCommandLink {
    fn send(&mut self, command: MotorCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!("Motor command dropped, uplink closed: {:?}", e.0);
            return;
        }

        match command {
            MotorCommand::StartVelocity { .. } | MotorCommand::UpdateVelocity { .. } => {
                self.velocity_running = true;
            }
            MotorCommand::StopVelocity => self.velocity_running = false,
            _ => {}
        }
        if let Some(action) = LastAction::after(&command) {
            self.last_action = action;
        }
        debug!("Motor command sent: {:?}", command);
    }
}

/// Rover command publisher over a bounded tokio channel.
///
/// A full queue drops the command; the next tick supersedes it anyway.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<RoverCommand>,
}

impl ChannelPublisher {
    /// Creates a publisher with room for `depth` pending commands.
    #[must_use]
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<RoverCommand>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }
}

impl RoverPublisher for ChannelPublisher {
    fn publish(&mut self, command: RoverCommand) {
        if let Err(e) = self.tx.try_send(command) {
            warn!("Rover command dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::ControlMode;
    use crate::controller::bindings::Seat;
    use crate::drive::{DriveCommand, KinematicMode};

    #[test]
    fn test_status_updates_with_dispatch() {
        let (mut link, mut rx) = MotorCommandLink::new();
        assert_eq!(link.last_action(), LastAction::None);
        assert!(!link.is_velocity_running());

        link.send(MotorCommand::StartVelocity { axis: 2, velocity: 0.4 });
        assert_eq!(link.last_action(), LastAction::VelocityStarted);
        assert!(link.is_velocity_running());

        link.send(MotorCommand::UpdateVelocity { velocity: 0.2 });
        assert_eq!(link.last_action(), LastAction::VelocityStarted);

        link.send(MotorCommand::StopVelocity);
        assert_eq!(link.last_action(), LastAction::VelocityStopped);
        assert!(!link.is_velocity_running());

        link.send(MotorCommand::Offset { axis: 2, offset: 1.0 });
        assert_eq!(link.last_action(), LastAction::Offset);

        link.send(MotorCommand::Confirm { axis: 2 });
        assert_eq!(link.last_action(), LastAction::Offset);

        let mut received = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            received.push(cmd);
        }
        assert_eq!(received.len(), 5);
        assert_eq!(received[0], MotorCommand::StartVelocity { axis: 2, velocity: 0.4 });
    }

    #[test]
    fn test_closed_uplink_leaves_status_untouched() {
        let (mut link, rx) = MotorCommandLink::new();
        drop(rx);
        link.send(MotorCommand::StartVelocity { axis: 0, velocity: 1.0 });
        assert_eq!(link.last_action(), LastAction::None);
        assert!(!link.is_velocity_running());
    }

    #[test]
    fn test_feedback_overwrites_status() {
        let (mut link, _rx) = MotorCommandLink::new();
        link.send(MotorCommand::StartVelocity { axis: 0, velocity: 1.0 });
        link.apply_feedback(LastAction::VelocityStopped, false);
        assert_eq!(link.last_action(), LastAction::VelocityStopped);
        assert!(!link.is_velocity_running());
    }

    #[tokio::test]
    async fn test_publisher_delivers() {
        let (mut publisher, mut rx) = ChannelPublisher::new(4);
        let command = RoverCommand::new(
            Seat(1),
            DriveCommand::neutral(KinematicMode::Crab),
            ControlMode::Rover,
        );
        publisher.publish(command);
        assert_eq!(rx.recv().await, Some(command));
    }

    #[test]
    fn test_publisher_drops_when_full() {
        let (mut publisher, mut rx) = ChannelPublisher::new(1);
        let command = RoverCommand::new(Seat(0), DriveCommand::default(), ControlMode::Rover);
        publisher.publish(command);
        publisher.publish(command);

        tokio_test::block_on(async {
            assert!(rx.recv().await.is_some());
        });
        assert!(rx.try_recv().is_err());
    }
}
