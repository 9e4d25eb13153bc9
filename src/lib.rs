//! # Rover Teleop Library
//!
//! Drive and calibrate a rover from one or more gamepads.
//!
//! Raw gamepad events are resolved to seat-qualified bindings, then fed to a drive
//! strategy, the control-mode arbiter and the axis calibration machine. The resulting
//! rover and motor commands leave through the dispatch channels and the serial uplink.

pub mod arbiter;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod docs;
pub mod drive;
pub mod error;
pub mod serial;
pub mod session;
