//! # Uplink Frame Codec
//!
//! Rover and motor commands travel to the rover as newline-delimited JSON.
//!
//! ```text
//! {"timestamp":"2026-01-01T12:00:00.250Z","sequence":42,"type":"motor","data":{"command":"stop_velocity"}}\n
//! ```
//!
//! `sequence` increments per frame on one link so the far side can spot gaps.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::{MotorCommand, RoverCommand};
use crate::error::Result;

/// Frame terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FramePayload {
    Rover(RoverCommand),
    Motor(MotorCommand),
}

/// One uplink frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    #[serde(flatten)]
    pub payload: FramePayload,
}

impl Frame {
    /// Stamps a payload with the current UTC time.
    #[must_use]
    pub fn now(sequence: u64, payload: FramePayload) -> Self {
        Self {
            timestamp: Utc::now(),
            sequence,
            payload,
        }
    }
}

/// Encodes a frame as one JSON line, delimiter included.
///
/// # Errors
///
/// Returns [`crate::error::TeleopError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```
/// use rover_teleop::dispatch::MotorCommand;
/// use rover_teleop::serial::frame::{encode_frame, Frame, FramePayload};
///
/// let frame = Frame::now(0, FramePayload::Motor(MotorCommand::StopVelocity));
/// let line = encode_frame(&frame).unwrap();
/// assert_eq!(line.last(), Some(&b'\n'));
/// ```
pub fn encode_frame(frame: &Frame) -> Result<Bytes> {
    let json = serde_json::to_vec(frame)?;
    let mut buf = BytesMut::with_capacity(json.len() + 1);
    buf.put_slice(&json);
    buf.put_u8(FRAME_DELIMITER);
    Ok(buf.freeze())
}

/// Decodes one line, with or without its delimiter.
///
/// # Errors
///
/// Returns [`crate::error::TeleopError::Encode`] if the line is not a valid frame.
pub fn decode_frame(line: &[u8]) -> Result<Frame> {
    let line = line.strip_suffix(&[FRAME_DELIMITER]).unwrap_or(line);
    Ok(serde_json::from_slice(line)?)
}
