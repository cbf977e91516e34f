//! Firmware identity and capabilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware family announced in the welcome banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirmwareFamily {
    /// Classic grbl
    Grbl,
    /// grblHAL
    GrblHal,
}

impl fmt::Display for FirmwareFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareFamily::Grbl => write!(f, "Grbl"),
            FirmwareFamily::GrblHal => write!(f, "GrblHAL"),
        }
    }
}

/// Firmware version (`1.1f`, optionally with a build date from `[VER:]`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Revision letter
    pub revision: Option<char>,
    /// Build identifier
    pub build: Option<String>,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(revision) = self.revision {
            write!(f, "{}", revision)?;
        }
        if let Some(ref build) = self.build {
            write!(f, ".{}", build)?;
        }
        Ok(())
    }
}

/// What is known about the connected firmware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Firmware family
    pub family: FirmwareFamily,
    /// Parsed version, when the banner carried one
    pub version: Option<FirmwareVersion>,
    /// Banner line as received
    pub banner: String,
    /// Option letters from `[OPT:]`
    pub options: Option<String>,
    /// Planner block count from `[OPT:]`
    pub planner_blocks: Option<u16>,
    /// Serial rx buffer size from `[OPT:]`
    pub rx_buffer_size: Option<u32>,
    /// Axis count from `[OPT:]` (grblHAL)
    pub axis_count: Option<u8>,
}

impl FirmwareInfo {
    /// Create from a banner with no capability data yet
    pub fn new(family: FirmwareFamily, version: Option<FirmwareVersion>, banner: impl Into<String>) -> Self {
        Self {
            family,
            version,
            banner: banner.into(),
            options: None,
            planner_blocks: None,
            rx_buffer_size: None,
            axis_count: None,
        }
    }

    /// Check for an `[OPT:]` option letter (`V` variable spindle, `H` homing init lock, ...)
    pub fn has_option(&self, letter: char) -> bool {
        self.options
            .as_deref()
            .is_some_and(|opts| opts.contains(letter))
    }
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.family, version),
            None => write!(f, "{}", self.family),
        }
    }
}
