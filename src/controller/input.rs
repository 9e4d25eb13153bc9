//! # Input Events and Sampling
//!
//! The boundary between the input layer and everything that consumes it.
//!
//! The input layer delivers two things:
//!
//! - discrete [`InputEvent`]s carrying a binding name and a press/release/echo flag,
//!   plus motion events for analog bindings that moved without crossing the held threshold
//! - continuous per-binding sampling through the [`InputState`] trait
//!
//! Binding names are already seat-qualified (see [`super::bindings::Seat`]).

use std::collections::HashMap;

/// Edge state of a discrete input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// The binding went from released to held.
    Pressed,
    /// The binding went from held to released.
    Released,
    /// Key-repeat of a binding that is still held.
    Echo,
    /// An analog binding changed value without crossing [`HELD_THRESHOLD`].
    Motion,
}

/// A discrete event for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// Seat-qualified binding name.
    pub binding: String,
    /// Edge state.
    pub state: ButtonState,
}

impl InputEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(binding: impl Into<String>, state: ButtonState) -> Self {
        Self {
            binding: binding.into(),
            state,
        }
    }

    /// Creates a press event.
    #[must_use]
    pub fn pressed(binding: impl Into<String>) -> Self {
        Self::new(binding, ButtonState::Pressed)
    }

    /// Creates a release event.
    #[must_use]
    pub fn released(binding: impl Into<String>) -> Self {
        Self::new(binding, ButtonState::Released)
    }

    /// Returns `true` for a genuine press edge of `binding` (echoes excluded).
    #[must_use]
    pub fn is_press_of(&self, binding: &str) -> bool {
        self.state == ButtonState::Pressed && self.binding == binding
    }

    /// Returns `true` for a release edge of `binding`.
    #[must_use]
    pub fn is_release_of(&self, binding: &str) -> bool {
        self.state == ButtonState::Released && self.binding == binding
    }
}

/// Continuous sampling of bindings.
///
/// Values are in `0.0..=1.0` per binding: buttons report 0 or 1, half-axes report
/// their deflection in that direction.
pub trait InputState {
    /// Current value of a binding. Unknown bindings read as 0.
    fn value(&self, binding: &str) -> f32;

    /// Whether a binding is currently held.
    fn is_held(&self, binding: &str) -> bool;

    /// Combined 1-D axis from two opposing bindings, in `-1.0..=1.0`.
    fn axis(&self, negative: &str, positive: &str) -> f32 {
        (self.value(positive) - self.value(negative)).clamp(-1.0, 1.0)
    }

    /// Combined 2-D vector from four opposing bindings.
    ///
    /// Each component is zeroed when its magnitude is below `deadzone`.
    fn vector(
        &self,
        negative_x: &str,
        positive_x: &str,
        negative_y: &str,
        positive_y: &str,
        deadzone: f32,
    ) -> (f32, f32) {
        let x = self.axis(negative_x, positive_x);
        let y = self.axis(negative_y, positive_y);
        let cut = |v: f32| if v.abs() < deadzone { 0.0 } else { v };
        (cut(x), cut(y))
    }
}

/// Threshold above which a half-axis binding counts as held.
pub const HELD_THRESHOLD: f32 = 0.5;

/// A plain map of binding values.
///
/// Used as the backing store of [`super::mapper::InputLayer`] and directly in tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    values: HashMap<String, f32>,
}

impl InputSnapshot {
    /// Creates an empty snapshot (everything released).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a binding value, clamped to `0.0..=1.0`.
    pub fn set(&mut self, binding: impl Into<String>, value: f32) {
        self.values.insert(binding.into(), value.clamp(0.0, 1.0));
    }

    /// Sets a button binding.
    pub fn set_held(&mut self, binding: impl Into<String>, held: bool) {
        self.set(binding, if held { 1.0 } else { 0.0 });
    }

    /// Drives two opposing bindings from one signed value.
    pub fn set_axis(&mut self, negative: &str, positive: &str, value: f32) {
        self.set(negative, (-value).max(0.0));
        self.set(positive, value.max(0.0));
    }

    /// Releases every binding.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl InputState for InputSnapshot {
    fn value(&self, binding: &str) -> f32 {
        self.values.get(binding).copied().unwrap_or(0.0)
    }

    fn is_held(&self, binding: &str) -> bool {
        self.value(binding) > HELD_THRESHOLD
    }
}
