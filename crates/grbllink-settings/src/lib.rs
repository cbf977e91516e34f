//! GrblLink Settings Crate
//!
//! Loads, validates and saves the link configuration file and turns it
//! into the runtime [`grbllink_core::ControllerConfig`].

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, HandshakeSettings, JogSettings, LinkSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
