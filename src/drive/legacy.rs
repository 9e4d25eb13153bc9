//! Legacy single-stick strategies.
//!
//! Both predate mode switching and always report [`super::KinematicMode::Compatibility`].
//! They share the output contract of the other strategies but deliberately keep their
//! own hand-tuned curves.

use std::f32::consts::FRAC_PI_2;

use super::{DriveContext, Vector3};
use crate::controller::input::InputState;

/// Steering lock of the wheel strategy (radians).
pub const WHEEL_MAX_STEER: f32 = 0.6;

/// Fraction of forward demand lost at full steering lock.
pub const WHEEL_SPEED_LOSS_AT_LOCK: f32 = 0.4;

/// Fraction of steering lost at full forward demand.
pub const WHEEL_STEER_LOSS_AT_SPEED: f32 = 0.5;

/// Largest travel angle off the forward axis for the strafe strategy (radians).
pub const STRAFE_MAX_ANGLE: f32 = 1.3;

/// Fraction of magnitude lost at the largest travel angle.
pub const STRAFE_LOSS_AT_MAX_ANGLE: f32 = 0.3;

/// Racing-wheel style turning.
///
/// The lateral stick sets a steering angle `θ = lateral · WHEEL_MAX_STEER`. Forward
/// demand is attenuated quadratically with `θ`, and the turn output
/// `sin θ / sin WHEEL_MAX_STEER` is attenuated linearly with forward speed. A
/// forced-steer deflection past its deadzone replaces the turn output.
pub(super) fn wheel<I: InputState + ?Sized>(input: &I, ctx: &DriveContext) -> Vector3 {
    let (forward, lateral) = ctx.planar(input);

    let theta = (lateral * WHEEL_MAX_STEER).clamp(-WHEEL_MAX_STEER, WHEEL_MAX_STEER);
    let lock = theta / WHEEL_MAX_STEER;

    let speed = forward * (1.0 - WHEEL_SPEED_LOSS_AT_LOCK * lock * lock);
    let turn = theta.sin() / WHEEL_MAX_STEER.sin() * (1.0 - WHEEL_STEER_LOSS_AT_SPEED * forward.abs());

    let turn = ctx.forced_steer(input).unwrap_or(turn);
    Vector3::new(speed, turn, 0.0).clamped()
}

/// Raw strafing.
///
/// The stick direction is the travel direction, measured off the forward axis and
/// capped at `STRAFE_MAX_ANGLE`. Magnitude drops quadratically towards that cap. A
/// forced-steer deflection past its deadzone replaces the lateral output.
pub(super) fn strafe<I: InputState + ?Sized>(input: &I, ctx: &DriveContext) -> Vector3 {
    let (forward, lateral) = ctx.planar(input);

    let magnitude = forward.hypot(lateral).min(1.0);
    let (x, y) = if magnitude == 0.0 {
        (0.0, 0.0)
    } else {
        // Angle off the forward axis, same for forward and reverse travel
        let phi = if forward == 0.0 {
            FRAC_PI_2.copysign(lateral)
        } else {
            (lateral / forward.abs()).atan()
        };
        let phi = phi.clamp(-STRAFE_MAX_ANGLE, STRAFE_MAX_ANGLE);
        let ratio = phi / STRAFE_MAX_ANGLE;
        let magnitude = magnitude * (1.0 - STRAFE_LOSS_AT_MAX_ANGLE * ratio * ratio);

        let x = if forward == 0.0 {
            0.0
        } else {
            forward.signum() * magnitude * phi.cos()
        };
        (x, magnitude * phi.sin())
    };

    let y = ctx.forced_steer(input).unwrap_or(y);
    Vector3::new(x, y, 0.0).clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::bindings::Seat;
    use crate::controller::input::InputSnapshot;

    fn stick(ctx: &DriveContext, forward: f32, lateral: f32) -> InputSnapshot {
        let b = &ctx.bindings;
        let mut input = InputSnapshot::new();
        input.set_axis(&b.backward, &b.forward, forward);
        input.set_axis(&b.left, &b.right, lateral);
        input
    }

    // ==================== Wheel ====================

    #[test]
    fn test_wheel_straight_is_unattenuated() {
        let c = DriveContext::new(Seat(0));
        let out = wheel(&stick(&c, 0.8, 0.0), &c);
        assert!((out.x - 0.8).abs() < 1e-6);
        assert_eq!(out.y, 0.0);
    }

    #[test]
    fn test_wheel_full_lock_costs_speed() {
        let c = DriveContext::new(Seat(0));
        let out = wheel(&stick(&c, 1.0, 1.0), &c);
        assert!((out.x - (1.0 - WHEEL_SPEED_LOSS_AT_LOCK)).abs() < 1e-5);
        assert!((out.y - (1.0 - WHEEL_STEER_LOSS_AT_SPEED)).abs() < 1e-5);
    }

    #[test]
    fn test_wheel_turn_in_place_has_full_steer() {
        let c = DriveContext::new(Seat(0));
        let out = wheel(&stick(&c, 0.0, -1.0), &c);
        assert_eq!(out.x, 0.0);
        assert!((out.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wheel_turn_is_nonlinear() {
        let c = DriveContext::new(Seat(0));
        let half = wheel(&stick(&c, 0.0, 0.5), &c).y;
        // sin curve: half deflection gives more than half the turn
        assert!(half > 0.5 && half < 1.0);
    }

    #[test]
    fn test_wheel_forced_steer_overrides() {
        let c = DriveContext::new(Seat(0));
        let mut input = stick(&c, 0.5, 0.9);
        input.set(&c.bindings.forced_steer_left, 0.7);
        let out = wheel(&input, &c);
        assert!((out.y + 0.7).abs() < 1e-6);

        // Below its own deadzone it is ignored
        input.set(&c.bindings.forced_steer_left, 0.1);
        let out = wheel(&input, &c);
        assert!(out.y > 0.0);
    }

    // ==================== Strafe ====================

    #[test]
    fn test_strafe_straight_is_unattenuated() {
        let c = DriveContext::new(Seat(0));
        let out = strafe(&stick(&c, -0.6, 0.0), &c);
        assert!((out.x + 0.6).abs() < 1e-6);
        assert_eq!(out.y, 0.0);
    }

    #[test]
    fn test_strafe_sideways_is_capped_and_attenuated() {
        let c = DriveContext::new(Seat(0));
        let out = strafe(&stick(&c, 0.0, 1.0), &c);
        assert_eq!(out.x, 0.0);
        let expected = (1.0 - STRAFE_LOSS_AT_MAX_ANGLE) * STRAFE_MAX_ANGLE.sin();
        assert!((out.y - expected).abs() < 1e-5);
    }

    #[test]
    fn test_strafe_diagonal_keeps_direction() {
        let c = DriveContext::new(Seat(0));
        let out = strafe(&stick(&c, 0.5, 0.5), &c);
        assert!(out.x > 0.0 && out.y > 0.0);
        assert!((out.x - out.y).abs() < 1e-5);

        let out = strafe(&stick(&c, -0.5, 0.5), &c);
        assert!(out.x < 0.0 && out.y > 0.0);
    }

    #[test]
    fn test_strafe_forced_steer_overrides() {
        let c = DriveContext::new(Seat(0));
        let mut input = stick(&c, 0.0, 0.0);
        input.set(&c.bindings.forced_steer_right, 0.9);
        let out = strafe(&input, &c);
        assert_eq!(out.x, 0.0);
        assert!((out.y - 0.9).abs() < 1e-6);
    }
}
