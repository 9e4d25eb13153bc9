//! # Error Types
//!
//! Custom error types for Rover Teleop using `thiserror`.

use thiserror::Error;

/// Main error type for Rover Teleop
#[derive(Debug, Error)]
pub enum TeleopError {
    /// A logical action name that is not in the binding table.
    ///
    /// This is a programming or configuration defect, not an operator error.
    #[error("Unknown logical action: {0}")]
    UnknownAction(String),

    /// Configuration parse errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values outside their valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Controller access errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No gamepad found on the system
    #[error("No gamepad found")]
    ControllerNotFound,

    /// Serial uplink errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Uplink frame encoding errors
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Rover Teleop
pub type Result<T> = std::result::Result<T, TeleopError>;
