//! # Gamepad Device Module
//!
//! Opens a gamepad through the Linux evdev interface.
//!
//! ## Device Detection
//!
//! When no explicit path is configured, `/dev/input/event*` devices are scanned in
//! sorted order and the first one that reports the gamepad face button `BTN_SOUTH`
//! is used. A PS5 DualSense (vendor 0x054c, product 0x0ce6) is preferred when several
//! gamepads are present.

use evdev::{Device, Key};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, TeleopError};

/// PS5 DualSense vendor ID (Sony)
const DUALSENSE_VENDOR_ID: u16 = 0x054c;

/// PS5 DualSense product ID (wired and Bluetooth)
const DUALSENSE_PRODUCT_ID: u16 = 0x0ce6;

/// Directory scanned for input devices.
const INPUT_DIR: &str = "/dev/input";

/// An open gamepad.
pub struct GamepadDevice {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for GamepadDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadDevice")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl GamepadDevice {
    /// Opens the gamepad at `path`, or auto-detects one when `path` is `None` or empty.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: auto-detection found no gamepad
    /// - `Controller`: the device could not be opened or `/dev/input` is unreadable
    pub fn open(path: Option<&str>) -> Result<Self> {
        match path.filter(|p| !p.is_empty()) {
            Some(p) => Self::open_path(Path::new(p)),
            None => Self::detect(),
        }
    }

    fn open_path(path: &Path) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            TeleopError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let device_path = path.to_string_lossy().to_string();
        info!("Opened gamepad at: {}", device_path);
        Ok(Self {
            device,
            device_path,
        })
    }

    fn detect() -> Result<Self> {
        let input_dir = Path::new(INPUT_DIR);
        if !input_dir.exists() {
            return Err(TeleopError::Controller(format!(
                "{} directory not found",
                INPUT_DIR
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)
            .map_err(|e| TeleopError::Controller(format!("Failed to read {}: {}", INPUT_DIR, e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Deterministic selection when several gamepads are connected
        paths.sort();

        let mut fallback: Option<(Device, PathBuf)> = None;
        for path in paths {
            let device = match Device::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    continue;
                }
            };

            let id = device.input_id();
            debug!(
                "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                path.display(),
                id.vendor(),
                id.product()
            );

            if is_dualsense(id.vendor(), id.product()) {
                info!("Found PS5 DualSense controller at: {}", path.display());
                return Ok(Self {
                    device,
                    device_path: path.to_string_lossy().to_string(),
                });
            }

            let is_gamepad = device
                .supported_keys()
                .map(|keys| keys.contains(Key::BTN_SOUTH))
                .unwrap_or(false);
            if is_gamepad && fallback.is_none() {
                fallback = Some((device, path));
            }
        }

        match fallback {
            Some((device, path)) => {
                info!("Found gamepad at: {}", path.display());
                Ok(Self {
                    device,
                    device_path: path.to_string_lossy().to_string(),
                })
            }
            None => Err(TeleopError::ControllerNotFound),
        }
    }

    /// Path of the opened device.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Human-readable device name.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Fetches pending events. Blocks until at least one is available.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the device was disconnected.
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| TeleopError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

fn is_dualsense(vendor: u16, product: u16) -> bool {
    vendor == DUALSENSE_VENDOR_ID && product == DUALSENSE_PRODUCT_ID
}
