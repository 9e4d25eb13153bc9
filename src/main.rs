//! # Rover Teleop
//!
//! Drive and calibrate a rover from one or more gamepads over a serial uplink.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging, optionally to a daily rolling file
//!    - Open one gamepad per configured seat and the serial uplink
//!
//! 2. **Main Loop**
//!    - Each gamepad event runs through its seat's session; motor commands go out
//!      immediately, followed by a fresh rover command for button edges
//!    - A lost gamepad releases its seat's controls and stops any calibration velocity
//!    - Every tick, each seat publishes its rover command
//!    - Ctrl+C shuts down
//!
//! 3. **Shutdown**
//!    - Publish a neutral e-brake command per seat and stop any calibration velocity
//!    - Drain the uplink
//!
//! Run with `--docs` to print the controller bindings as JSON and exit.

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use rover_teleop::config::{Config, LoggingConfig};
use rover_teleop::controller::bindings::Seat;
use rover_teleop::controller::device::GamepadDevice;
use rover_teleop::controller::input::ButtonState;
use rover_teleop::controller::mapper::InputLayer;
use rover_teleop::dispatch::{
    ChannelPublisher, MotorChannel, MotorCommand, MotorCommandLink, MotorStatus, RoverCommand,
    RoverPublisher,
};
use rover_teleop::docs::export_json;
use rover_teleop::drive::{DriveCommand, KinematicMode};
use rover_teleop::serial::{run_uplink, SerialLink};

/// Configuration file used when none is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Raw events buffered between the device threads and the control loop
const DEVICE_QUEUE_DEPTH: usize = 256;

/// Ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 1000;

/// How long shutdown waits for the uplink to drain
const UPLINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Message from a device reader thread
enum DeviceMessage {
    Event(usize, evdev::InputEvent),
    Lost(usize),
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut print_docs = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--docs" => print_docs = true,
            path => config_path = path.to_string(),
        }
    }

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    if print_docs {
        for index in 0..config.seats.len() {
            let seat = Seat(index as u8);
            let session = config.session(seat);
            println!("{}", export_json(&session.controllers(), seat)?);
        }
        return Ok(());
    }

    let _log_guard = init_logging(&config.logging);
    info!("Rover Teleop v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    run(config).await
}

/// Installs the global subscriber; keep the guard alive to flush file output.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rover-teleop.log");
            let (file, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stdout.and(file))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Reads one gamepad on a blocking thread and forwards its events.
fn spawn_reader(index: usize, mut device: GamepadDevice, tx: mpsc::Sender<DeviceMessage>) {
    std::thread::spawn(move || {
        let path = device.device_path().to_string();
        loop {
            match device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        if tx.blocking_send(DeviceMessage::Event(index, event)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Seat {}: gamepad {} lost: {}", index, path, e);
                    let _ = tx.blocking_send(DeviceMessage::Lost(index));
                    return;
                }
            }
        }
    });
}

async fn run(config: Config) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel(DEVICE_QUEUE_DEPTH);
    let mut layers = Vec::with_capacity(config.seats.len());
    let mut sessions = Vec::with_capacity(config.seats.len());

    for (index, seat_config) in config.seats.iter().enumerate() {
        let seat = Seat(index as u8);
        let path = (!seat_config.device_path.is_empty()).then_some(seat_config.device_path.as_str());
        let device = GamepadDevice::open(path)
            .with_context(|| format!("Failed to open gamepad for seat {}", index))?;
        info!(
            "Seat {}: {} at {}",
            index,
            device.name().unwrap_or("unnamed gamepad"),
            device.device_path()
        );

        spawn_reader(index, device, event_tx.clone());
        layers.push(InputLayer::new(seat));
        sessions.push(config.session(seat));
    }
    drop(event_tx);

    let link = SerialLink::open(config.link_port(), config.link.baud_rate)?;
    let (mut motor, motor_rx) = MotorCommandLink::new();
    let (mut publisher, rover_rx) = ChannelPublisher::new(config.link.queue_depth);
    let uplink = tokio::spawn(run_uplink(link, motor_rx, rover_rx));

    let mut memory = config.calibration_memory();
    let mut ticker = interval(config.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Control loop running at {}Hz", config.tick.tick_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            Some(message) = event_rx.recv() => match message {
                DeviceMessage::Event(index, raw) => {
                    let (layer, session) = (&mut layers[index], &mut sessions[index]);
                    for event in layer.process_event(&raw) {
                        let effects = session.handle_event(&event, &*layer, &mut memory, &motor, Instant::now());
                        for command in effects.motor_commands {
                            motor.send(command);
                        }
                        // Stick motion reaches the rover on the next tick
                        if event.state != ButtonState::Motion {
                            publisher.publish(session.tick(Some(&event), &*layer));
                        }
                    }
                }
                DeviceMessage::Lost(index) => {
                    warn!("Seat {}: input lost, treating controls as released", index);
                    layers[index].reset();
                    for command in sessions[index].input_lost(&motor) {
                        motor.send(command);
                    }
                }
            },

            _ = ticker.tick() => {
                for (session, layer) in sessions.iter_mut().zip(&layers) {
                    publisher.publish(session.tick(None, layer));
                }

                tick_count += 1;
                if tick_count % LOG_INTERVAL_TICKS == 0 {
                    debug!("{} ticks, modes: {:?}", tick_count, sessions.iter().map(|s| s.mode()).collect::<Vec<_>>());
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    for session in &sessions {
        publisher.publish(RoverCommand::new(
            session.seat(),
            DriveCommand::neutral(KinematicMode::EBrake),
            session.mode(),
        ));
    }
    if motor.is_velocity_running() {
        motor.send(MotorCommand::StopVelocity);
    }
    drop(publisher);
    drop(motor);

    match timeout(UPLINK_DRAIN_TIMEOUT, uplink).await {
        Ok(Ok(frames)) => info!("Uplink closed after {} frames", frames),
        Ok(Err(e)) => warn!("Uplink task failed: {}", e),
        Err(_) => warn!("Uplink did not drain within {:?}", UPLINK_DRAIN_TIMEOUT),
    }

    Ok(())
}
