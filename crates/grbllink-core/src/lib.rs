//! # GrblLink Core
//!
//! Core types for GrblLink.
//! Provides the error taxonomy, the machine and connection data model,
//! controller events and the runtime policy shared by every crate.

pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod event_bus;

pub use config::ControllerConfig;

pub use data::{
    AlarmCondition, Axis, ConfigurationSetting, ConnectionPhase, ControllerSnapshot,
    ErrorCondition, ErrorSeverity, FaultCondition, FirmwareFamily, FirmwareInfo, FirmwareVersion,
    MachineConfiguration, MachineMode, MachineStatus, OverrideValues, Position,
};

pub use error::{ConnectionError, ControllerError, Error, FirmwareError, Result};

pub use event_bus::{
    CommandEvent, ConfigurationEvent, ConnectionEvent, ControllerEvent, DisconnectReason,
    EventBus, EventBusConfig, EventBusError, EventCategory, EventFilter, FaultEvent, MachineEvent,
    SubscriptionId,
};
