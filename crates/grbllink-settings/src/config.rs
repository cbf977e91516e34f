//! Link configuration file
//!
//! Configuration is organized into sections:
//! - Connection (controller address, connect timeout)
//! - Link policy (heartbeat, detection window, escalation, capacities)
//! - Jog defaults
//! - Handshake command list
//!
//! Files are `.toml` or `.json`, chosen by extension. Every section has
//! defaults, so a partial file is valid.

use grbllink_core::constants;
use grbllink_core::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

const APP_DIR: &str = "grbllink";
const CONFIG_FILE: &str = "config.toml";

/// Where and how to reach the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// `host:port`, `tcp://host:port` or `ws://host:port/path`
    pub address: Option<String>,
    /// Time allowed to open the transport
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Timing and flow-control policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Status query period while the link is up
    pub heartbeat_interval_ms: u64,
    /// Consecutive unanswered status queries before the link is dropped
    pub missed_heartbeat_threshold: u32,
    /// Time allowed for the controller to identify itself
    pub detection_timeout_ms: u64,
    /// Consecutive command rejections before a controller error
    pub error_escalation_threshold: u32,
    /// Maximum queued commands
    pub queue_capacity: usize,
    /// Events buffered per broadcast subscriber
    pub event_capacity: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: constants::DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64,
            missed_heartbeat_threshold: constants::DEFAULT_MISSED_HEARTBEAT_THRESHOLD,
            detection_timeout_ms: constants::DEFAULT_DETECTION_TIMEOUT.as_millis() as u64,
            error_escalation_threshold: constants::DEFAULT_ERROR_ESCALATION_THRESHOLD,
            queue_capacity: constants::DEFAULT_QUEUE_CAPACITY,
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Jog defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JogSettings {
    /// Travel of a continuous jog in mm
    pub continuous_distance_mm: f64,
    /// Feed rate used when none is given, mm/min
    pub default_feed_rate: f64,
    /// Step used by incremental jogs, mm
    pub default_step_mm: f64,
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            continuous_distance_mm: constants::DEFAULT_CONTINUOUS_JOG_DISTANCE,
            default_feed_rate: 1000.0,
            default_step_mm: 1.0,
        }
    }
}

/// Commands sent after the controller is detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeSettings {
    /// Sent in order once the firmware is detected
    pub commands: Vec<String>,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            commands: constants::default_handshake_commands(),
        }
    }
}

/// Complete link configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[connection]`
    pub connection: ConnectionSettings,
    /// `[link]`
    pub link: LinkSettings,
    /// `[jog]`
    pub jog: JogSettings,
    /// `[handshake]`
    pub handshake: HandshakeSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Platform location of the configuration file
    pub fn default_path() -> ConfigResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load `path`, or the defaults if it does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(address) = &self.connection.address {
            if address.trim().is_empty() || address.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidSetting {
                    key: "connection.address".to_string(),
                    reason: "must be a single non-empty token".to_string(),
                });
            }
        }

        let positive = [
            ("connection.connect_timeout_ms", self.connection.connect_timeout_ms),
            ("link.heartbeat_interval_ms", self.link.heartbeat_interval_ms),
            ("link.detection_timeout_ms", self.link.detection_timeout_ms),
            (
                "link.missed_heartbeat_threshold",
                u64::from(self.link.missed_heartbeat_threshold),
            ),
            (
                "link.error_escalation_threshold",
                u64::from(self.link.error_escalation_threshold),
            ),
            ("link.queue_capacity", self.link.queue_capacity as u64),
            ("link.event_capacity", self.link.event_capacity as u64),
        ];
        if let Some((key, value)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValueOutOfRange {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        let distances = [
            ("jog.continuous_distance_mm", self.jog.continuous_distance_mm),
            ("jog.default_feed_rate", self.jog.default_feed_rate),
            ("jog.default_step_mm", self.jog.default_step_mm),
        ];
        if let Some((key, value)) = distances
            .iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0))
        {
            return Err(ConfigError::ValueOutOfRange {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        if let Some(command) = self
            .handshake
            .commands
            .iter()
            .find(|c| c.trim().is_empty() || c.contains('\n') || c.contains('\r'))
        {
            return Err(ConfigError::InvalidSetting {
                key: "handshake.commands".to_string(),
                reason: format!("{:?} is not a single command line", command),
            });
        }

        Ok(())
    }

    /// Runtime policy for the controller
    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            heartbeat_interval: Duration::from_millis(self.link.heartbeat_interval_ms),
            missed_heartbeat_threshold: self.link.missed_heartbeat_threshold,
            detection_timeout: Duration::from_millis(self.link.detection_timeout_ms),
            connect_timeout: Duration::from_millis(self.connection.connect_timeout_ms),
            error_escalation_threshold: self.link.error_escalation_threshold,
            queue_capacity: self.link.queue_capacity,
            event_capacity: self.link.event_capacity,
            continuous_jog_distance: self.jog.continuous_distance_mm,
            handshake_commands: self.handshake.commands.clone(),
        }
    }
}
