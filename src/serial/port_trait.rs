//! Serial port seam, so the uplink can run against a mock in tests.

use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;

use crate::error::{Result, TeleopError};

/// Byte sink the uplink writes frames to.
#[async_trait]
pub trait SerialPortIO: Send {
    /// Writes the whole buffer.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flushes pending output.
    async fn flush(&mut self) -> io::Result<()>;
}

/// A real serial port, 8N1 without flow control.
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    /// Opens `path` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::Serial`] if the device cannot be opened.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TeleopError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(Self { port })
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
