//! Error handling for GrblLink
//!
//! Error types for each layer of the link:
//! - Controller errors (state machine, command flow, detection and liveness)
//! - Connection errors (transport establishment and loss)
//! - Firmware errors (protocol decoding and settings)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Controller error type
///
/// Represents errors raised by the controller state machine and the
/// command channel it owns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Controller is not connected
    #[error("Controller not connected")]
    NotConnected,

    /// A connection attempt is already active
    #[error("Controller already connected")]
    AlreadyConnected,

    /// Command submitted in a phase that does not accept it
    #[error("Controller not ready ({phase}): cannot send '{command}'")]
    NotReady {
        /// The connection phase at submission time.
        phase: String,
        /// The command that was refused.
        command: String,
    },

    /// Invalid state transition
    #[error("Invalid state transition from {current} to {requested}")]
    InvalidStateTransition {
        /// The current phase name.
        current: String,
        /// The requested phase name.
        requested: String,
    },

    /// Command answered with `error:` by the firmware
    #[error("Command rejected{}: {message}", code.map(|c| format!(" (error:{c})")).unwrap_or_default())]
    CommandRejected {
        /// The numeric error code, when the firmware sent one.
        code: Option<u16>,
        /// Human readable description of the code.
        message: String,
    },

    /// Command dropped without an acknowledgment
    #[error("Command failed: {reason}")]
    CommandFailed {
        /// Why the command will never be acknowledged.
        reason: String,
    },

    /// Command text is not a single sendable line
    #[error("Invalid command: {reason}")]
    InvalidCommand {
        /// The reason the command is invalid.
        reason: String,
    },

    /// Too many commands queued
    #[error("Command queue full ({capacity} commands)")]
    BufferOverflow {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Jog request refused
    #[error("Jog rejected: {reason}")]
    JogRejected {
        /// The reason the jog was refused.
        reason: String,
    },

    /// No firmware banner or status report arrived in time
    #[error("Controller not detected within {timeout_ms}ms")]
    DetectionTimeout {
        /// The detection timeout in milliseconds.
        timeout_ms: u64,
    },

    /// No status report for too many heartbeat periods
    #[error("Controller stopped responding: no status report for {missed} heartbeat periods")]
    LivenessTimeout {
        /// Heartbeat periods since the last report.
        missed: u32,
    },

    /// The controller task has stopped
    #[error("Controller task has shut down")]
    Shutdown,

    /// Generic controller error
    #[error("Controller error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Connection error type
///
/// Represents errors establishing or keeping a TCP or WebSocket link.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Address could not be understood
    #[error("Invalid address: {address}")]
    InvalidAddress {
        /// The address as given by the caller.
        address: String,
    },

    /// Failed to open the link
    #[error("Failed to connect to {address}: {reason}")]
    ConnectFailed {
        /// The address that was dialled.
        address: String,
        /// The reason the connection failed.
        reason: String,
    },

    /// Connection timeout
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// WebSocket error
    #[error("WebSocket error: {reason}")]
    WebSocketError {
        /// The reason for the WebSocket error.
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::IoError {
            reason: err.to_string(),
        }
    }
}

/// Firmware error type
///
/// Represents protocol-level decoding problems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FirmwareError {
    /// Response parsing error
    #[error("Failed to parse firmware response: {reason}")]
    ResponseParseError {
        /// The reason the response parsing failed.
        reason: String,
    },
}

/// Main error type for GrblLink
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Firmware error
    #[error(transparent)]
    Firmware(#[from] FirmwareError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Controller(ControllerError::DetectionTimeout { .. })
                | Error::Controller(ControllerError::LivenessTimeout { .. })
                | Error::Connection(ConnectionError::ConnectionTimeout { .. })
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    /// Check if this is a firmware error
    pub fn is_firmware_error(&self) -> bool {
        matches!(self, Error::Firmware(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
