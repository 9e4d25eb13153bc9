//! # Serial Uplink Module
//!
//! Carries rover and motor commands to the rover over a USB serial link.
//!
//! This module handles:
//! - Opening the port by path or by trying the usual USB device nodes
//! - Stamping each command into a [`frame::Frame`] and writing it as one JSON line
//! - Draining the command channels in [`run_uplink`] until both are closed
//!
//! Write failures are logged and the command is dropped. The drive stream is
//! refreshed every tick, and calibration commands are operator-initiated.

pub mod frame;
pub mod port_trait;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatch::{MotorCommand, RoverCommand};
use crate::error::{Result, TeleopError};
use frame::{encode_frame, Frame, FramePayload};
use port_trait::{SerialPortIO, TokioSerialPort};

/// Default uplink baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Device paths tried when none is configured, in order.
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Frame writer over a serial port.
pub struct SerialLink<P = TokioSerialPort> {
    port: P,
    device_path: String,
    sequence: u64,
}

impl<P> std::fmt::Debug for SerialLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl SerialLink<TokioSerialPort> {
    /// Opens the configured port, or auto-detects one when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::SerialPortNotFound`] if no candidate opens.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_teleop::serial::{SerialLink, DEFAULT_BAUD_RATE};
    ///
    /// let link = SerialLink::open(None, DEFAULT_BAUD_RATE)?;
    /// println!("Uplink on {}", link.device_path());
    /// # Ok::<(), rover_teleop::error::TeleopError>(())
    /// ```
    pub fn open(path: Option<&str>, baud_rate: u32) -> Result<Self> {
        match path {
            Some(path) => Self::open_with_paths(&[path], baud_rate),
            None => Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate),
        }
    }

    /// Tries each path in order and keeps the first that opens.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::SerialPortNotFound`] listing every path tried.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match TokioSerialPort::open(path, baud_rate) {
                Ok(port) => {
                    info!("Uplink opened at {} ({} baud)", path, baud_rate);
                    return Ok(Self::new(port, *path));
                }
                Err(e) => warn!("Failed to open {}: {}", path, e),
            }
        }

        Err(TeleopError::SerialPortNotFound(paths.join(", ")))
    }
}

impl<P: SerialPortIO> SerialLink<P> {
    /// Wraps an already-open port.
    pub fn new(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            sequence: 0,
        }
    }

    /// Stamps and writes one payload.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::Serial`] on write failure, [`TeleopError::Encode`] if the
    /// frame cannot be serialized.
    pub async fn send(&mut self, payload: FramePayload) -> Result<()> {
        let frame = Frame::now(self.sequence, payload);
        self.send_frame(&frame).await?;
        self.sequence += 1;
        Ok(())
    }

    /// Writes a prepared frame and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::Serial`] on write or flush failure.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let line = encode_frame(frame)?;

        self.port
            .write_all(&line)
            .await
            .map_err(|e| TeleopError::Serial(format!("Failed to write frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| TeleopError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent frame {} ({} bytes)", frame.sequence, line.len());
        Ok(())
    }

    /// Path of the opened device.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Frames written successfully.
    pub fn frames_sent(&self) -> u64 {
        self.sequence
    }
}

/// Forwards commands to the link until both channels close.
///
/// Pending motor commands go out before rover commands. Returns the number of frames
/// written.
pub async fn run_uplink<P: SerialPortIO>(
    mut link: SerialLink<P>,
    mut motor_rx: mpsc::UnboundedReceiver<MotorCommand>,
    mut rover_rx: mpsc::Receiver<RoverCommand>,
) -> u64 {
    info!("Uplink task started on {}", link.device_path());

    loop {
        let payload = tokio::select! {
            biased;
            Some(command) = motor_rx.recv() => FramePayload::Motor(command),
            Some(command) = rover_rx.recv() => FramePayload::Rover(command),
            else => break,
        };

        if let Err(e) = link.send(payload).await {
            warn!("Dropped {:?}: {}", payload, e);
        }
    }

    info!("Uplink task stopped after {} frames", link.frames_sent());
    link.frames_sent()
}
