//! Controller documentation export.
//!
//! Every [`Controller`] can describe the bindings it reads, with their physical
//! defaults, for the settings UI and for printed cheat sheets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::controller::bindings::{all_bindings_for, Controller, Seat};
use crate::error::Result;

/// Description of one controller for one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerDocs {
    pub name: String,
    pub notes: String,
    /// Binding name -> physical inputs, e.g. `"estop.1" -> ["BTN_MODE"]`.
    pub bindings: BTreeMap<String, Vec<String>>,
}

impl ControllerDocs {
    #[must_use]
    pub fn for_controller(controller: &dyn Controller, seat: Seat) -> Self {
        let bindings = all_bindings_for(controller, seat)
            .into_iter()
            .map(|(binding, inputs)| (binding, inputs.iter().map(ToString::to_string).collect()))
            .collect();

        Self {
            name: controller.name().to_string(),
            notes: controller.usage_notes().to_string(),
            bindings,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TeleopError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Documents several controllers as one JSON array.
///
/// # Errors
///
/// Returns [`crate::error::TeleopError::Encode`] if serialization fails.
pub fn export_json(controllers: &[&dyn Controller], seat: Seat) -> Result<String> {
    let docs: Vec<ControllerDocs> = controllers
        .iter()
        .map(|controller| ControllerDocs::for_controller(*controller, seat))
        .collect();
    Ok(serde_json::to_string_pretty(&docs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{ControlModeArbiter, DEFAULT_ESTOP_WINDOW};
    use crate::calibration::{AxisCalibration, OperatePolicy};
    use crate::drive::DriveStrategy;

    #[test]
    fn test_docs_use_seat_bindings() {
        let arbiter = ControlModeArbiter::new(Seat(1), DEFAULT_ESTOP_WINDOW);
        let docs = ControllerDocs::for_controller(&arbiter, Seat(1));

        assert_eq!(docs.name, "Control mode");
        assert!(docs.bindings.contains_key("estop.1"));
        assert!(docs.bindings.contains_key("cycle_mode.1"));
        assert!(!docs.bindings.contains_key("estop"));
        assert!(docs.bindings.values().all(|inputs| !inputs.is_empty()));
    }

    #[test]
    fn test_docs_json_shape() {
        let calibration = AxisCalibration::new(Seat(0), OperatePolicy::Toggle);
        let json = ControllerDocs::for_controller(&calibration, Seat(0)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["name"], "Axis calibration");
        assert!(value["notes"].as_str().unwrap().contains("D-pad"));
        assert!(value["bindings"]["calibration_dpad_left"].is_array());
    }

    #[test]
    fn test_export_json_lists_every_controller() {
        let strategy = DriveStrategy::ModeSwitching;
        let arbiter = ControlModeArbiter::new(Seat(0), DEFAULT_ESTOP_WINDOW);
        let calibration = AxisCalibration::new(Seat(0), OperatePolicy::Hold);

        let json = export_json(&[&strategy, &arbiter, &calibration], Seat(0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }
}
