//! # GrblLink
//!
//! Keeps a live, consistent model of a grblHAL CNC controller over TCP
//! (telnet) or WebSocket:
//! - Firmware detection and the configuration handshake (`$I`, `$10=511`, `$$`)
//! - Send-response flow control with real-time bytes bypassing the queue
//! - Heartbeat status polling and dead-link detection
//! - Alarm and error ledgers that gate which commands may be sent
//!
//! ## Architecture
//!
//! GrblLink is organized as a workspace with three crates:
//!
//! 1. **grbllink-core** - Errors, data model, events, runtime policy
//! 2. **grbllink-communication** - Transports, grblHAL protocol, controller actor
//! 3. **grbllink-settings** - Configuration file handling
//!
//! The `grbllink` binary is a small console built on top of them.

pub use grbllink_communication::firmware;
pub use grbllink_core::data;

pub use grbllink_core::{
    Axis, ConnectionError, ConnectionPhase, ControllerConfig, ControllerError, ControllerEvent,
    ControllerSnapshot, Error, EventBus, FaultCondition, FirmwareError, FirmwareInfo,
    MachineConfiguration, MachineMode, MachineStatus, Position, Result,
};

pub use grbllink_communication::{
    CommandResponse, CommandResult, CommandTicket, Connector, ControllerHandle, Endpoint,
    JogDirection, JogRequest, MemoryConnector, MemoryPeer, NetworkConnector,
};

pub use grbllink_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Logs go to stderr so console output on stdout stays clean.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    Ok(())
}
