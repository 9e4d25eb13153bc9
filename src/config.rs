//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; a missing value takes its default.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::arbiter::ControlModeArbiter;
use crate::calibration::{AxisCalibration, CalibrationMemory, OperatePolicy};
use crate::controller::bindings::Seat;
use crate::dispatch::{AxisId, NO_AXIS};
use crate::drive::{DriveContext, DriveStrategy, ModePolicy};
use crate::error::{Result, TeleopError};
use crate::session::TeleopSession;

/// Most operator seats one process serves.
pub const MAX_SEATS: usize = 4;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default, rename = "loop")]
    pub tick: LoopConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_seats")]
    pub seats: Vec<SeatConfig>,
}

/// Drive tuning shared by all seats
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    #[serde(default)]
    pub strategy: DriveStrategy,

    #[serde(default)]
    pub mode_policy: ModePolicy,

    #[serde(default)]
    pub speed_limit_enabled: bool,

    #[serde(default = "default_speed_modifier")]
    pub speed_modifier: f32,

    #[serde(default = "default_forced_steer_deadzone")]
    pub forced_steer_deadzone: f32,
}

/// Safety configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    #[serde(default = "default_estop_confirm_window_ms")]
    pub estop_confirm_window_ms: u64,
}

/// Calibration machine tuning and the initial calibration memory
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub operate_policy: OperatePolicy,

    #[serde(default = "default_center_deadzone")]
    pub center_deadzone: f32,

    #[serde(default = "default_select_threshold")]
    pub select_threshold: f32,

    #[serde(default = "default_calibration_velocity")]
    pub velocity: f32,

    #[serde(default = "default_calibration_offset")]
    pub offset: f32,

    /// Initially selected motor axis; unset means none.
    #[serde(default)]
    pub axis: Option<AxisId>,

    /// Motor axis behind each wheel index; when set, wheel selection retargets the axis.
    #[serde(default)]
    pub wheel_axes: Option<[AxisId; 4]>,

    #[serde(default)]
    pub panel_visible: bool,
}

/// Serial uplink configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Empty means try the usual USB serial devices.
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone)]
pub struct LoopConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset.
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One operator seat
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeatConfig {
    /// Empty means auto-detect.
    #[serde(default)]
    pub device_path: String,
}

// Default value functions
fn default_deadzone() -> f32 { 0.1 }
fn default_speed_modifier() -> f32 { 0.5 }
fn default_forced_steer_deadzone() -> f32 { 0.2 }

fn default_estop_confirm_window_ms() -> u64 { 5000 }

fn default_center_deadzone() -> f32 { 0.15 }
fn default_select_threshold() -> f32 { 0.8 }
fn default_calibration_velocity() -> f32 { 0.2 }
fn default_calibration_offset() -> f32 { 0.5 }

fn default_baud_rate() -> u32 { 115_200 }
fn default_queue_depth() -> usize { 64 }

fn default_tick_rate_hz() -> u32 { 50 }

fn default_log_level() -> String { "info".to_string() }

fn default_seats() -> Vec<SeatConfig> { vec![SeatConfig::default()] }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            strategy: DriveStrategy::default(),
            mode_policy: ModePolicy::default(),
            speed_limit_enabled: false,
            speed_modifier: default_speed_modifier(),
            forced_steer_deadzone: default_forced_steer_deadzone(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            estop_confirm_window_ms: default_estop_confirm_window_ms(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            operate_policy: OperatePolicy::default(),
            center_deadzone: default_center_deadzone(),
            select_threshold: default_select_threshold(),
            velocity: default_calibration_velocity(),
            offset: default_calibration_offset(),
            axis: None,
            wheel_axes: None,
            panel_visible: false,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            safety: SafetyConfig::default(),
            calibration: CalibrationConfig::default(),
            link: LinkConfig::default(),
            tick: LoopConfig::default(),
            logging: LoggingConfig::default(),
            seats: default_seats(),
        }
    }
}

fn invalid(message: impl Into<String>) -> TeleopError {
    TeleopError::InvalidConfig(message.into())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::InvalidConfig`] naming the first value out of range
    pub fn validate(&self) -> Result<()> {
        let c = &self.controller;
        if !(0.0..=0.5).contains(&c.deadzone) {
            return Err(invalid("deadzone must be between 0.0 and 0.5"));
        }
        if !(c.speed_modifier > 0.0 && c.speed_modifier <= 1.0) {
            return Err(invalid("speed_modifier must be greater than 0.0 and at most 1.0"));
        }
        if !(0.0..1.0).contains(&c.forced_steer_deadzone) {
            return Err(invalid("forced_steer_deadzone must be between 0.0 and 1.0"));
        }

        if !(1..=60_000).contains(&self.safety.estop_confirm_window_ms) {
            return Err(invalid("estop_confirm_window_ms must be between 1 and 60000"));
        }

        let cal = &self.calibration;
        if !(0.0..1.0).contains(&cal.center_deadzone) {
            return Err(invalid("center_deadzone must be between 0.0 and 1.0"));
        }
        if cal.select_threshold > 1.0 || cal.select_threshold <= cal.center_deadzone {
            return Err(invalid("select_threshold must exceed center_deadzone and be at most 1.0"));
        }
        if !cal.velocity.is_finite() || !cal.offset.is_finite() {
            return Err(invalid("calibration velocity and offset must be finite"));
        }

        if self.link.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }
        if self.link.queue_depth == 0 {
            return Err(invalid("queue_depth must be greater than 0"));
        }

        if !(1..=1000).contains(&self.tick.tick_rate_hz) {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        if self.seats.is_empty() || self.seats.len() > MAX_SEATS {
            return Err(invalid(format!("between 1 and {} seats must be configured", MAX_SEATS)));
        }

        Ok(())
    }

    /// Drive context for a seat
    #[must_use]
    pub fn drive_context(&self, seat: Seat) -> DriveContext {
        let c = &self.controller;
        let mut ctx = DriveContext::new(seat);
        ctx.deadzone = c.deadzone;
        ctx.speed_modifier = c.speed_limit_enabled.then_some(c.speed_modifier);
        ctx.mode_policy = c.mode_policy;
        ctx.forced_steer_deadzone = c.forced_steer_deadzone;
        ctx
    }

    /// Estop confirmation window
    #[must_use]
    pub fn estop_window(&self) -> Duration {
        Duration::from_millis(self.safety.estop_confirm_window_ms)
    }

    /// Calibration machine for a seat
    #[must_use]
    pub fn calibration_machine(&self, seat: Seat) -> AxisCalibration {
        let cal = &self.calibration;
        let machine = AxisCalibration::new(seat, cal.operate_policy)
            .with_thresholds(cal.center_deadzone, cal.select_threshold);
        match cal.wheel_axes {
            Some(axes) => machine.with_wheel_axes(axes),
            None => machine,
        }
    }

    /// Calibration memory as loaded from settings
    #[must_use]
    pub fn calibration_memory(&self) -> CalibrationMemory {
        let cal = &self.calibration;
        CalibrationMemory {
            panel_visible: cal.panel_visible,
            offset_value: cal.offset,
            velocity_value: cal.velocity,
            chosen_axis: cal.axis.unwrap_or(NO_AXIS),
            ..CalibrationMemory::default()
        }
    }

    /// Fully wired session for a seat
    #[must_use]
    pub fn session(&self, seat: Seat) -> TeleopSession {
        TeleopSession::new(
            seat,
            self.controller.strategy,
            self.drive_context(seat),
            ControlModeArbiter::new(seat, self.estop_window()),
            self.calibration_machine(seat),
        )
    }

    /// Control loop period
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick.tick_rate_hz.max(1)))
    }

    /// Configured uplink port, `None` for auto-detection
    #[must_use]
    pub fn link_port(&self) -> Option<&str> {
        (!self.link.port.is_empty()).then_some(self.link.port.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::KinematicMode;

    fn assert_invalid(config: &Config, needle: &str) {
        match config.validate() {
            Err(TeleopError::InvalidConfig(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {}", msg);
            }
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seats.len(), 1);
        assert_eq!(config.controller.strategy, DriveStrategy::ModeSwitching);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_deadzone(), 0.1);
        assert_eq!(default_speed_modifier(), 0.5);
        assert_eq!(default_forced_steer_deadzone(), 0.2);
        assert_eq!(default_estop_confirm_window_ms(), 5000);
        assert_eq!(default_center_deadzone(), 0.15);
        assert_eq!(default_select_threshold(), 0.8);
        assert_eq!(default_tick_rate_hz(), 50);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[controller]
deadzone = 0.2
strategy = "legacy_strafe"
mode_policy = "hold"
speed_limit_enabled = true
speed_modifier = 0.25

[safety]
estop_confirm_window_ms = 3000

[calibration]
operate_policy = "hold"
velocity = 0.75
axis = 2
wheel_axes = [4, 5, 6, 7]
panel_visible = true

[link]
port = "/dev/ttyUSB1"

[loop]
tick_rate_hz = 100

[logging]
dir = "/tmp/rover-logs"

[[seats]]
device_path = "/dev/input/event3"

[[seats]]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.controller.strategy, DriveStrategy::LegacyStrafe);
        assert_eq!(config.controller.mode_policy, ModePolicy::Hold);
        assert_eq!(config.calibration.operate_policy, OperatePolicy::Hold);
        assert_eq!(config.calibration.wheel_axes, Some([4, 5, 6, 7]));
        assert_eq!(config.link_port(), Some("/dev/ttyUSB1"));
        assert_eq!(config.tick_period(), Duration::from_millis(10));
        assert_eq!(config.estop_window(), Duration::from_secs(3));
        assert_eq!(config.seats.len(), 2);
        assert_eq!(config.seats[0].device_path, "/dev/input/event3");
        assert!(config.seats[1].device_path.is_empty());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.link_port(), None);
        assert_eq!(config.tick_period(), Duration::from_millis(20));
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let result = Config::from_toml("[controller]\nstrategy = \"hover\"\n");
        assert!(matches!(result, Err(TeleopError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/rover-teleop.toml");
        assert!(matches!(result, Err(TeleopError::Io(_))));
    }

    // ==================== Validation ====================

    #[test]
    fn test_deadzone_out_of_range() {
        let mut config = Config::default();
        config.controller.deadzone = 0.6;
        assert_invalid(&config, "deadzone");
        config.controller.deadzone = -0.1;
        assert_invalid(&config, "deadzone");
    }

    #[test]
    fn test_speed_modifier_range() {
        let mut config = Config::default();
        config.controller.speed_modifier = 0.0;
        assert_invalid(&config, "speed_modifier");
        config.controller.speed_modifier = 1.5;
        assert_invalid(&config, "speed_modifier");
        config.controller.speed_modifier = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_estop_window_range() {
        let mut config = Config::default();
        config.safety.estop_confirm_window_ms = 0;
        assert_invalid(&config, "estop_confirm_window_ms");
        config.safety.estop_confirm_window_ms = 60_001;
        assert_invalid(&config, "estop_confirm_window_ms");
    }

    #[test]
    fn test_select_threshold_must_exceed_center() {
        let mut config = Config::default();
        config.calibration.select_threshold = 0.1;
        assert_invalid(&config, "select_threshold");
        config.calibration.select_threshold = 1.2;
        assert_invalid(&config, "select_threshold");
    }

    #[test]
    fn test_tick_rate_range() {
        let mut config = Config::default();
        config.tick.tick_rate_hz = 0;
        assert_invalid(&config, "tick_rate_hz");
        config.tick.tick_rate_hz = 1001;
        assert_invalid(&config, "tick_rate_hz");
    }

    #[test]
    fn test_link_limits() {
        let mut config = Config::default();
        config.link.queue_depth = 0;
        assert_invalid(&config, "queue_depth");

        let mut config = Config::default();
        config.link.baud_rate = 0;
        assert_invalid(&config, "baud_rate");
    }

    #[test]
    fn test_logging_values() {
        let mut config = Config::default();
        config.logging.dir = Some(String::new());
        assert_invalid(&config, "dir");

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert_invalid(&config, "level");
    }

    #[test]
    fn test_seat_count() {
        let mut config = Config::default();
        config.seats.clear();
        assert_invalid(&config, "seats");
        config.seats = vec![SeatConfig::default(); MAX_SEATS + 1];
        assert_invalid(&config, "seats");
    }

    // ==================== Builders ====================

    #[test]
    fn test_drive_context_speed_limit() {
        let mut config = Config::default();
        assert_eq!(config.drive_context(Seat(0)).speed_modifier, None);

        config.controller.speed_limit_enabled = true;
        let ctx = config.drive_context(Seat(2));
        assert_eq!(ctx.speed_modifier, Some(0.5));
        assert_eq!(ctx.bindings.forward, "drive_forward.2");
    }

    #[test]
    fn test_calibration_memory_seed() {
        let mut config = Config::default();
        assert_eq!(config.calibration_memory().axis(), None);

        config.calibration.axis = Some(3);
        config.calibration.panel_visible = true;
        let memory = config.calibration_memory();
        assert_eq!(memory.axis(), Some(3));
        assert!(memory.panel_visible);
        assert_eq!(memory.velocity_value, 0.2);
        assert_eq!(memory.offset_value, 0.5);
    }

    #[test]
    fn test_session_uses_configured_strategy() {
        let mut config = Config::default();
        config.controller.strategy = DriveStrategy::EBrake;
        let mut session = config.session(Seat(0));
        let input = crate::controller::input::InputSnapshot::new();
        assert_eq!(session.tick(None, &input).drive.mode, KinematicMode::EBrake);
    }
}
