//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so they can be logged or replayed.
//! They form an append-only record of what the controller observed and did.

use serde::{Deserialize, Serialize};

use crate::data::{
    ConfigurationSetting, ConnectionPhase, ErrorSeverity, FaultCondition, FirmwareInfo,
    MachineMode, MachineStatus,
};

/// Root event enum for everything a controller publishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Link phase and transport events
    Connection(ConnectionEvent),
    /// Machine status events
    Machine(MachineEvent),
    /// Command flow events
    Command(CommandEvent),
    /// Firmware settings events
    Configuration(ConfigurationEvent),
    /// Alarms, errors and link faults
    Fault(FaultEvent),
}

impl ControllerEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            ControllerEvent::Connection(_) => EventCategory::Connection,
            ControllerEvent::Machine(_) => EventCategory::Machine,
            ControllerEvent::Command(_) => EventCategory::Command,
            ControllerEvent::Configuration(_) => EventCategory::Configuration,
            ControllerEvent::Fault(_) => EventCategory::Fault,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            ControllerEvent::Connection(e) => e.description(),
            ControllerEvent::Machine(e) => e.description(),
            ControllerEvent::Command(e) => e.description(),
            ControllerEvent::Configuration(e) => e.description(),
            ControllerEvent::Fault(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Link phase and transport events.
    Connection,
    /// Machine status events.
    Machine,
    /// Command flow events.
    Command,
    /// Firmware settings events.
    Configuration,
    /// Alarm, error and link fault events.
    Fault,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Connection => write!(f, "Connection"),
            EventCategory::Machine => write!(f, "Machine"),
            EventCategory::Command => write!(f, "Command"),
            EventCategory::Configuration => write!(f, "Configuration"),
            EventCategory::Fault => write!(f, "Fault"),
        }
    }
}

/// Reason for disconnection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// User requested disconnect
    UserRequested,
    /// Transport could not be opened
    ConnectFailed(String),
    /// Transport closed or failed
    ConnectionLost(String),
    /// No banner or status report within the detection window
    DetectionTimeout,
    /// Heartbeat queries went unanswered
    LivenessTimeout,
    /// Controller task stopped
    Shutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::UserRequested => write!(f, "user requested"),
            DisconnectReason::ConnectFailed(reason) => write!(f, "connect failed: {}", reason),
            DisconnectReason::ConnectionLost(reason) => write!(f, "connection lost: {}", reason),
            DisconnectReason::DetectionTimeout => write!(f, "controller not detected"),
            DisconnectReason::LivenessTimeout => write!(f, "controller stopped responding"),
            DisconnectReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Connection-related events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// The state machine moved to a new phase.
    PhaseChanged {
        /// Previous phase.
        from: ConnectionPhase,
        /// New phase.
        to: ConnectionPhase,
    },
    /// Welcome banner or `$I` data identified the firmware.
    FirmwareIdentified(FirmwareInfo),
    /// The link went down.
    Disconnected {
        /// Why the link went down.
        reason: DisconnectReason,
    },
}

impl ConnectionEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            ConnectionEvent::PhaseChanged { from, to } => format!("Phase {} -> {}", from, to),
            ConnectionEvent::FirmwareIdentified(info) => format!("Firmware {}", info),
            ConnectionEvent::Disconnected { reason } => format!("Disconnected: {}", reason),
        }
    }
}

/// Machine status events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MachineEvent {
    /// A status report was merged; carries the merged status.
    StatusUpdated(MachineStatus),
    /// The reported mode changed.
    ModeChanged {
        /// Previous mode.
        from: MachineMode,
        /// New mode.
        to: MachineMode,
    },
    /// `[MSG:...]` feedback from the firmware.
    Message {
        /// Message text.
        text: String,
    },
}

impl MachineEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            MachineEvent::StatusUpdated(status) => format!("Status {}", status.mode),
            MachineEvent::ModeChanged { from, to } => format!("Mode {} -> {}", from, to),
            MachineEvent::Message { text } => format!("Message: {}", text),
        }
    }
}

/// Command flow events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandEvent {
    /// Command written to the transport.
    Sent {
        /// Command id.
        id: u64,
        /// Command text.
        command: String,
    },
    /// Command acknowledged with `ok`.
    Completed {
        /// Command id.
        id: u64,
        /// Command text.
        command: String,
    },
    /// Command acknowledged with `error:`.
    Rejected {
        /// Command id.
        id: u64,
        /// Command text.
        command: String,
        /// Error code, if numeric.
        code: Option<u16>,
        /// Decoded error message.
        message: String,
    },
    /// Command dropped without acknowledgment.
    Failed {
        /// Command id.
        id: u64,
        /// Command text.
        command: String,
        /// Why it was dropped.
        reason: String,
    },
    /// Real-time byte written.
    RealtimeSent {
        /// The byte.
        byte: u8,
    },
    /// Jog request refused by gating.
    JogIgnored {
        /// Why it was refused.
        reason: String,
    },
}

impl CommandEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            CommandEvent::Sent { id, command } => format!("Sent #{}: {}", id, command),
            CommandEvent::Completed { id, command } => format!("Completed #{}: {}", id, command),
            CommandEvent::Rejected {
                id,
                command,
                message,
                ..
            } => format!("Rejected #{}: {} ({})", id, command, message),
            CommandEvent::Failed {
                id,
                command,
                reason,
            } => format!("Failed #{}: {} ({})", id, command, reason),
            CommandEvent::RealtimeSent { byte } => format!("Real-time 0x{:02X}", byte),
            CommandEvent::JogIgnored { reason } => format!("Jog ignored: {}", reason),
        }
    }
}

/// Firmware settings events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConfigurationEvent {
    /// A `$` setting was reported with a new value.
    SettingChanged(ConfigurationSetting),
    /// All settings were discarded.
    Reset,
}

impl ConfigurationEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            ConfigurationEvent::SettingChanged(setting) => {
                format!("${}={}", setting.id, setting.value)
            }
            ConfigurationEvent::Reset => "Settings reset".to_string(),
        }
    }
}

/// Alarm, error and link fault events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FaultEvent {
    /// Alarm recorded.
    AlarmRaised(FaultCondition),
    /// Error recorded.
    ErrorRaised(FaultCondition),
    /// Alarm and error ledgers cleared.
    Cleared,
    /// Transport, detection or liveness failure.
    LinkFault {
        /// Error message.
        message: String,
        /// Severity tier.
        severity: ErrorSeverity,
    },
}

impl FaultEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            FaultEvent::AlarmRaised(alarm) => format!("Alarm {}", alarm),
            FaultEvent::ErrorRaised(error) => format!("Error {}", error),
            FaultEvent::Cleared => "Faults cleared".to_string(),
            FaultEvent::LinkFault { message, severity } => {
                format!("Link fault ({}): {}", severity, message)
            }
        }
    }
}
