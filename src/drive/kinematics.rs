//! Mode-switching kinematics.

use super::{DriveContext, KinematicMode, ModePolicy, Vector3};
use crate::controller::input::{InputEvent, InputState};

/// Picks the mode for the mode-switching strategy.
///
/// Toggle: a press edge of a mode binding sets that mode, otherwise the previous mode
/// stays. Hold: Ackermann unless a mode binding is held, Crab > Spinner > EBrake.
pub(super) fn select_mode<I: InputState + ?Sized>(
    event: Option<&InputEvent>,
    input: &I,
    previous: &super::DriveCommand,
    ctx: &DriveContext,
) -> KinematicMode {
    let b = &ctx.bindings;
    match ctx.mode_policy {
        ModePolicy::Toggle => {
            let pressed = event.and_then(|e| {
                [
                    (&b.mode_ackermann, KinematicMode::Ackermann),
                    (&b.mode_crab, KinematicMode::Crab),
                    (&b.mode_spinner, KinematicMode::Spinner),
                    (&b.mode_ebrake, KinematicMode::EBrake),
                ]
                .into_iter()
                .find(|(binding, _)| e.is_press_of(binding))
                .map(|(_, mode)| mode)
            });
            match (pressed, previous.mode) {
                (Some(mode), _) => mode,
                // Coming from a legacy strategy
                (None, KinematicMode::Compatibility) => KinematicMode::Ackermann,
                (None, mode) => mode,
            }
        }
        ModePolicy::Hold => {
            if input.is_held(&b.mode_crab) {
                KinematicMode::Crab
            } else if input.is_held(&b.mode_spinner) {
                KinematicMode::Spinner
            } else if input.is_held(&b.mode_ebrake) {
                KinematicMode::EBrake
            } else {
                KinematicMode::Ackermann
            }
        }
    }
}

/// Linear demand for a kinematic mode.
pub(super) fn linear_for_mode<I: InputState + ?Sized>(
    mode: KinematicMode,
    input: &I,
    ctx: &DriveContext,
) -> Vector3 {
    match mode {
        KinematicMode::Ackermann => {
            let (forward, lateral) = ctx.planar(input);
            Vector3::new(forward, lateral, 0.0)
        }
        KinematicMode::Crab => {
            let (forward, lateral) = ctx.planar(input);
            Vector3::new(forward, lateral, ctx.vertical(input))
        }
        KinematicMode::Spinner => {
            let (rate, _) = ctx.planar(input);
            Vector3::new(rate, 0.0, 0.0)
        }
        KinematicMode::EBrake | KinematicMode::Compatibility => Vector3::ZERO,
    }
}
