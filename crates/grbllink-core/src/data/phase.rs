//! Connection phases of the controller state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the link to the controller currently stands.
///
/// ```text
/// Disconnected -> Connecting -> TransportUp -> ControllerDetected -> Ready
///                                                   Ready <-> Alarm
///                                                   Ready <-> ControllerError
/// any connected phase -> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionPhase {
    /// No transport
    #[default]
    Disconnected,
    /// Transport being established
    Connecting,
    /// Byte stream open, firmware not yet identified
    TransportUp,
    /// Firmware answered, handshake in progress
    ControllerDetected,
    /// Handshake complete and status confirmed
    Ready,
    /// Firmware alarm active
    Alarm,
    /// Repeated command rejections
    ControllerError,
}

impl ConnectionPhase {
    /// Check whether `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        match (self, next) {
            (Disconnected, Disconnected) => false,
            (_, Disconnected) => true,
            (Disconnected, Connecting) => true,
            (Connecting, TransportUp) => true,
            (TransportUp, ControllerDetected) => true,
            (ControllerDetected, Ready) => true,
            (Ready, Alarm) | (Ready, ControllerError) => true,
            (Alarm, Ready) | (ControllerError, Ready) => true,
            (ControllerError, Alarm) => true,
            _ => false,
        }
    }

    /// Byte stream is open, so real-time bytes can be written
    pub fn transport_open(&self) -> bool {
        !matches!(
            self,
            ConnectionPhase::Disconnected | ConnectionPhase::Connecting
        )
    }

    /// Connection attempt active or established
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionPhase::Disconnected)
    }

    /// Firmware has been identified and the handshake finished
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            ConnectionPhase::Ready | ConnectionPhase::Alarm | ConnectionPhase::ControllerError
        )
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Disconnected => "Disconnected",
            ConnectionPhase::Connecting => "Connecting",
            ConnectionPhase::TransportUp => "TransportUp",
            ConnectionPhase::ControllerDetected => "ControllerDetected",
            ConnectionPhase::Ready => "Ready",
            ConnectionPhase::Alarm => "Alarm",
            ConnectionPhase::ControllerError => "ControllerError",
        };
        write!(f, "{}", name)
    }
}
