//! # Control-Mode Arbiter
//!
//! Selects which subsystem the operator is driving and watches for the emergency-stop
//! confirmation gesture.
//!
//! ## Transitions
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | estop pressed | gesture starts |
//! | estop released, gesture younger than the window | estop confirmed, gesture cleared |
//! | estop released, gesture older than the window | gesture cleared |
//! | estop held + mode-select pressed | mode set directly, gesture cleared |
//! | estop not held + cycle pressed | next mode, wrapping to `Rover` |
//!
//! Key-repeat echoes never count as presses.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use rover_teleop::arbiter::{ControlMode, ControlModeArbiter};
//! use rover_teleop::controller::bindings::Seat;
//! use rover_teleop::controller::input::{InputEvent, InputSnapshot};
//!
//! let mut arbiter = ControlModeArbiter::new(Seat(0), Duration::from_secs(5));
//! let mut input = InputSnapshot::new();
//! let t0 = Instant::now();
//!
//! input.set_held("estop", true);
//! arbiter.handle(&InputEvent::pressed("estop"), &input, t0);
//! input.set_held("estop", false);
//! let outcome = arbiter.handle(&InputEvent::released("estop"), &input, t0 + Duration::from_secs(1));
//! assert!(outcome.estop_confirmed);
//! assert_eq!(outcome.mode, ControlMode::Rover);
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::controller::bindings::{resolve_action, Action, Controller, Seat};
use crate::controller::input::{InputEvent, InputState};

/// Default estop confirmation window.
pub const DEFAULT_ESTOP_WINDOW: Duration = Duration::from_secs(5);

/// Operational mode. Cycling follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Rover,
    Manipulator,
    Sampler,
    Autonomy,
}

impl ControlMode {
    /// All modes in cycling order.
    pub const ALL: [ControlMode; 4] = [
        ControlMode::Rover,
        ControlMode::Manipulator,
        ControlMode::Sampler,
        ControlMode::Autonomy,
    ];

    /// The next mode, wrapping past the last back to `Rover`.
    #[must_use]
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlMode::Rover => "rover",
            ControlMode::Manipulator => "manipulator",
            ControlMode::Sampler => "sampler",
            ControlMode::Autonomy => "autonomy",
        };
        f.write_str(name)
    }
}

/// Result of feeding one event to the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterOutcome {
    /// Mode after the event.
    pub mode: ControlMode,
    /// Whether the mode changed on this event.
    pub mode_changed: bool,
    /// The estop gesture was confirmed; the caller must carry out the stop.
    pub estop_confirmed: bool,
}

#[derive(Debug, Clone)]
struct ArbiterBindings {
    estop: String,
    cycle: String,
    select: [(String, ControlMode); 4],
}

/// The control-mode state machine: one mode plus an optional pending gesture.
#[derive(Debug, Clone)]
pub struct ControlModeArbiter {
    bindings: ArbiterBindings,
    window: Duration,
    mode: ControlMode,
    estop_pressed_at: Option<Instant>,
}

impl ControlModeArbiter {
    /// Creates an arbiter in `Rover` mode.
    #[must_use]
    pub fn new(seat: Seat, window: Duration) -> Self {
        let r = |action| resolve_action(action, seat);
        Self {
            bindings: ArbiterBindings {
                estop: r(Action::Estop),
                cycle: r(Action::CycleMode),
                select: [
                    (r(Action::SelectRover), ControlMode::Rover),
                    (r(Action::SelectManipulator), ControlMode::Manipulator),
                    (r(Action::SelectSampler), ControlMode::Sampler),
                    (r(Action::SelectAutonomy), ControlMode::Autonomy),
                ],
            },
            window,
            mode: ControlMode::Rover,
            estop_pressed_at: None,
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Whether the estop binding is held. D-pad presses then select modes.
    pub fn estop_held<I: InputState + ?Sized>(&self, input: &I) -> bool {
        input.is_held(&self.bindings.estop)
    }

    /// Whether an estop gesture is pending.
    #[must_use]
    pub fn gesture_pending(&self) -> bool {
        self.estop_pressed_at.is_some()
    }

    /// Feeds one discrete event at time `now`.
    pub fn handle<I: InputState + ?Sized>(
        &mut self,
        event: &InputEvent,
        input: &I,
        now: Instant,
    ) -> ArbiterOutcome {
        let before = self.mode;
        let mut estop_confirmed = false;

        if event.is_press_of(&self.bindings.estop) {
            debug!("Estop gesture started");
            self.estop_pressed_at = Some(now);
        } else if event.is_release_of(&self.bindings.estop) {
            if let Some(pressed_at) = self.estop_pressed_at.take() {
                let held_for = now.saturating_duration_since(pressed_at);
                if held_for < self.window {
                    estop_confirmed = true;
                } else {
                    debug!("Estop held for {:?}, gesture expired", held_for);
                }
            }
        } else if input.is_held(&self.bindings.estop) {
            let selected = self
                .bindings
                .select
                .iter()
                .find(|(binding, _)| event.is_press_of(binding))
                .map(|(_, mode)| *mode);
            if let Some(mode) = selected {
                self.mode = mode;
                self.estop_pressed_at = None;
            }
        } else if event.is_press_of(&self.bindings.cycle) {
            self.mode = self.mode.next();
        }

        if self.mode != before {
            info!("Control mode: {} -> {}", before, self.mode);
        }

        ArbiterOutcome {
            mode: self.mode,
            mode_changed: self.mode != before,
            estop_confirmed,
        }
    }
}

const ARBITER_ACTIONS: &[Action] = &[
    Action::Estop,
    Action::CycleMode,
    Action::SelectRover,
    Action::SelectManipulator,
    Action::SelectSampler,
    Action::SelectAutonomy,
];

impl Controller for ControlModeArbiter {
    fn name(&self) -> &'static str {
        "Control mode"
    }

    fn actions(&self) -> &'static [Action] {
        ARBITER_ACTIONS
    }

    fn usage_notes(&self) -> &'static str {
        "Tap the estop button and release it within five seconds to stop the rover. \
         While holding estop, a d-pad direction jumps straight to a mode and cancels \
         the stop; that press is not passed on to calibration. Options cycles Rover, \
         Manipulator, Sampler, Autonomy."
    }
}
