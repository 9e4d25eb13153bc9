//! # Controller Input Mapper Module
//!
//! Translates raw evdev events from one gamepad into seat-qualified binding events and
//! keeps the continuous binding values up to date.
//!
//! ## Value Normalisation
//!
//! | Source | evdev range | Binding value |
//! |--------|-------------|---------------|
//! | Stick axis | 0-255, 128 centre | each half-axis 0.0..=1.0 |
//! | Hat (d-pad) | -1/0/1 | each half-axis 0 or 1 |
//! | Trigger | 0-255 | 0.0..=1.0 |
//! | Key / button | 0/1/2 | 0 or 1 (2 is key-repeat) |
//!
//! A half-axis or trigger binding emits a press edge when it crosses
//! [`HELD_THRESHOLD`] and a release edge when it drops back below it. Any other
//! change of its value emits a [`ButtonState::Motion`] event, so consumers that read
//! analog values see every step of a stick sweep.
//!
//! ## Usage
//!
//! ```no_run
//! use rover_teleop::controller::bindings::Seat;
//! use rover_teleop::controller::device::GamepadDevice;
//! use rover_teleop::controller::mapper::InputLayer;
//!
//! let mut device = GamepadDevice::open(None)?;
//! let mut layer = InputLayer::new(Seat(0));
//!
//! for event in device.fetch_events()? {
//!     for binding_event in layer.process_event(&event) {
//!         println!("{:?}", binding_event);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use evdev::{AbsoluteAxisType, InputEvent as DeviceEvent, InputEventKind, Key};
use tracing::trace;

use super::bindings::{resolve_action, Action, RawInput, Seat};
use super::input::{ButtonState, InputEvent, InputSnapshot, InputState, HELD_THRESHOLD};

/// Raw stick axis centre value.
pub const AXIS_CENTER: i32 = 128;

/// evdev key value for a key-repeat.
const KEY_REPEAT: i32 = 2;

/// Converts a raw stick value (0-255) to `-1.0..=1.0`.
#[must_use]
pub fn normalize_axis(raw: i32) -> f32 {
    (((raw as f32) - AXIS_CENTER as f32) / 127.0).clamp(-1.0, 1.0)
}

/// Converts a raw trigger value (0-255) to `0.0..=1.0`.
#[must_use]
pub fn normalize_trigger(raw: i32) -> f32 {
    ((raw as f32) / 255.0).clamp(0.0, 1.0)
}

fn is_hat(axis: AbsoluteAxisType) -> bool {
    matches!(
        axis,
        AbsoluteAxisType::ABS_HAT0X | AbsoluteAxisType::ABS_HAT0Y
    )
}

/// A physical input routed to one seat-qualified binding.
#[derive(Debug, Clone)]
struct Route {
    input: RawInput,
    binding: String,
}

/// Per-seat input layer.
///
/// Not thread-safe; owned by the input-processing task.
#[derive(Debug)]
pub struct InputLayer {
    seat: Seat,
    routes: Vec<Route>,
    values: InputSnapshot,
}

impl InputLayer {
    /// Creates a layer routing every action's default inputs for `seat`.
    #[must_use]
    pub fn new(seat: Seat) -> Self {
        let routes = Action::ALL
            .iter()
            .flat_map(|action| {
                let binding = resolve_action(*action, seat);
                action.defaults().iter().map(move |input| Route {
                    input: *input,
                    binding: binding.clone(),
                })
            })
            .collect();

        Self {
            seat,
            routes,
            values: InputSnapshot::new(),
        }
    }

    /// Seat this layer serves.
    #[must_use]
    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Processes one evdev event, returning the binding edges it produced.
    pub fn process_event(&mut self, event: &DeviceEvent) -> Vec<InputEvent> {
        match event.kind() {
            InputEventKind::Key(key) => self.process_key(key, event.value()),
            InputEventKind::AbsAxis(axis) => self.process_axis(axis, event.value()),
            _ => Vec::new(),
        }
    }

    fn process_key(&mut self, key: Key, value: i32) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for route in self.routes.iter().filter(|r| r.input == RawInput::Button(key)) {
            let was_held = self.values.is_held(&route.binding);
            if value == KEY_REPEAT {
                if was_held {
                    events.push(InputEvent::new(route.binding.clone(), ButtonState::Echo));
                }
                continue;
            }
            let held = value != 0;
            self.values.set_held(route.binding.clone(), held);
            if let Some(state) = edge(was_held, held) {
                events.push(InputEvent::new(route.binding.clone(), state));
            }
        }
        trace!("{:?} key {:?}={} -> {} events", self.seat, key, value, events.len());
        events
    }

    fn process_axis(&mut self, axis: AbsoluteAxisType, raw: i32) -> Vec<InputEvent> {
        let centred = if is_hat(axis) {
            raw.clamp(-1, 1) as f32
        } else {
            normalize_axis(raw)
        };

        let mut events = Vec::new();
        for route in &self.routes {
            let value = match route.input {
                RawInput::AxisNegative(a) if a == axis => (-centred).max(0.0),
                RawInput::AxisPositive(a) if a == axis => centred.max(0.0),
                RawInput::Trigger(a) if a == axis => normalize_trigger(raw),
                _ => continue,
            };
            let previous = self.values.value(&route.binding);
            let was_held = self.values.is_held(&route.binding);
            self.values.set(route.binding.clone(), value);
            if let Some(state) = edge(was_held, value > HELD_THRESHOLD) {
                events.push(InputEvent::new(route.binding.clone(), state));
            } else if value != previous {
                events.push(InputEvent::new(route.binding.clone(), ButtonState::Motion));
            }
        }
        events
    }

    /// Releases every binding (controller reconnect).
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

fn edge(was_held: bool, held: bool) -> Option<ButtonState> {
    match (was_held, held) {
        (false, true) => Some(ButtonState::Pressed),
        (true, false) => Some(ButtonState::Released),
        _ => None,
    }
}

impl InputState for InputLayer {
    fn value(&self, binding: &str) -> f32 {
        self.values.value(binding)
    }

    fn is_held(&self, binding: &str) -> bool {
        self.values.is_held(binding)
    }
}
