//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Translating raw events into seat-qualified binding events
//! - Resolving logical actions to binding names per operator seat

pub mod bindings;
pub mod device;
pub mod input;
pub mod mapper;
