//! Calibration state shared with the settings layer.

use serde::{Deserialize, Serialize};

use crate::dispatch::{AxisId, NO_AXIS};

/// Wheel index meaning "no wheel selected".
pub const NO_WHEEL: i32 = -1;

/// Number of selectable wheels.
pub const WHEEL_COUNT: i32 = 4;

/// Which physical axis is targeted and with what magnitudes.
///
/// Owned by the session, mutated only on the input-processing task, persisted by
/// whoever owns the settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationMemory {
    /// Calibration commands are only issued while the panel is shown.
    pub panel_visible: bool,
    pub offset_value: f32,
    pub velocity_value: f32,
    pub chosen_axis: AxisId,
    pub chosen_wheel: i32,
}

impl Default for CalibrationMemory {
    fn default() -> Self {
        Self {
            panel_visible: false,
            offset_value: 0.0,
            velocity_value: 0.0,
            chosen_axis: NO_AXIS,
            chosen_wheel: NO_WHEEL,
        }
    }
}

impl CalibrationMemory {
    /// Selected axis, if any.
    #[must_use]
    pub fn axis(&self) -> Option<AxisId> {
        (self.chosen_axis != NO_AXIS).then_some(self.chosen_axis)
    }

    /// Wheel index after stepping once in `direction` (+1 next, -1 back).
    ///
    /// From "no wheel", next lands on 0 and back on the last wheel.
    #[must_use]
    pub fn stepped_wheel(&self, direction: i32) -> i32 {
        let current = if self.chosen_wheel == NO_WHEEL && direction < 0 {
            0
        } else {
            self.chosen_wheel
        };
        (current + direction).rem_euclid(WHEEL_COUNT)
    }
}

/// How the calibration binding enters operate mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatePolicy {
    /// Each press flips operate mode.
    #[default]
    Toggle,
    /// Operate mode only while held.
    Hold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_nothing_selected() {
        let memory = CalibrationMemory::default();
        assert_eq!(memory.axis(), None);
        assert_eq!(memory.chosen_wheel, NO_WHEEL);
        assert!(!memory.panel_visible);
    }

    #[test]
    fn test_stepped_wheel_wraps() {
        let mut memory = CalibrationMemory::default();
        assert_eq!(memory.stepped_wheel(1), 0);
        assert_eq!(memory.stepped_wheel(-1), 3);

        memory.chosen_wheel = 0;
        assert_eq!(memory.stepped_wheel(-1), 3);
        memory.chosen_wheel = 3;
        assert_eq!(memory.stepped_wheel(1), 0);
        memory.chosen_wheel = 1;
        assert_eq!(memory.stepped_wheel(1), 2);
    }

    #[test]
    fn test_memory_deserializes_partial() {
        let memory: CalibrationMemory =
            serde_json::from_str(r#"{"panel_visible": true, "chosen_axis": 4}"#).unwrap();
        assert!(memory.panel_visible);
        assert_eq!(memory.axis(), Some(4));
        assert_eq!(memory.chosen_wheel, NO_WHEEL);
    }
}
