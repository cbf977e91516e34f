//! Firmware protocol implementations
//!
//! grblHAL is the supported controller; classic grbl 1.1 speaks the same
//! line protocol and is handled by the same code.

pub mod grblhal;

pub use grblhal::{JogCommand, JogDirection, ProtocolMessage, StatusParser};
