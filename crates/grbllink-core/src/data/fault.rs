//! Alarm and error conditions reported by the firmware.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tier of a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Recoverable, informational
    Warning,
    /// Operation failed
    Error,
    /// Machine halted or position lost
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// An alarm or error reported by the controller.
///
/// Conditions never expire on their own; they stay in the controller's
/// ledger until an unlock, homing cycle or reset is acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultCondition {
    /// Numeric code, absent for textual reports
    pub code: Option<u16>,
    /// Short display name
    pub name: String,
    /// Longer description
    pub description: String,
    /// Severity tier
    pub severity: ErrorSeverity,
    /// When the condition was observed
    pub detected_at: DateTime<Utc>,
}

impl FaultCondition {
    /// Create a condition stamped with the current time
    pub fn new(
        code: Option<u16>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: ErrorSeverity,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            description: description.into(),
            severity,
            detected_at: Utc::now(),
        }
    }
}

impl fmt::Display for FaultCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}: {}", code, self.name, self.description),
            None => write!(f, "{}: {}", self.name, self.description),
        }
    }
}

/// Alarm reported through `ALARM:` or an alarm status mode
pub type AlarmCondition = FaultCondition;

/// Error reported through `error:`
pub type ErrorCondition = FaultCondition;
