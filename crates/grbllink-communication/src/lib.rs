//! # GrblLink Communication
//!
//! grblHAL protocol handling and the controller state machine.
//! Transports are TCP (telnet) and WebSocket, plus an in-memory link used
//! to simulate a controller in tests.

pub mod communication;
pub mod controller;
pub mod firmware;

pub use communication::{
    Acknowledgment, CommandChannel, CommandResponse, CommandResult, CommandSink, CommandTicket,
    Connector, Endpoint, LineFramer, LineSource, LinkWriter, LivenessMonitor, MemoryConnector,
    MemoryPeer, NetworkConnector, PeerInput, TransportLink,
};

pub use controller::{ControllerHandle, JogRequest};

pub use firmware::{JogCommand, JogDirection, ProtocolMessage, StatusParser};
