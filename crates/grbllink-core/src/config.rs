//! Runtime policy for a controller link.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::error::ControllerError;

/// Timing and flow-control policy used by the controller state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Status query period while the link is up
    pub heartbeat_interval: Duration,
    /// Unanswered queries before the link is declared dead
    pub missed_heartbeat_threshold: u32,
    /// Window for banner/status and handshake after the transport opens
    pub detection_timeout: Duration,
    /// Window for opening the transport
    pub connect_timeout: Duration,
    /// Consecutive command rejections before `ControllerError`
    pub error_escalation_threshold: u32,
    /// Maximum queued commands
    pub queue_capacity: usize,
    /// Broadcast capacity for events
    pub event_capacity: usize,
    /// Travel requested by a continuous jog (mm)
    pub continuous_jog_distance: f64,
    /// Commands sent once the firmware is detected
    pub handshake_commands: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: constants::DEFAULT_HEARTBEAT_INTERVAL,
            missed_heartbeat_threshold: constants::DEFAULT_MISSED_HEARTBEAT_THRESHOLD,
            detection_timeout: constants::DEFAULT_DETECTION_TIMEOUT,
            connect_timeout: constants::DEFAULT_CONNECT_TIMEOUT,
            error_escalation_threshold: constants::DEFAULT_ERROR_ESCALATION_THRESHOLD,
            queue_capacity: constants::DEFAULT_QUEUE_CAPACITY,
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
            continuous_jog_distance: constants::DEFAULT_CONTINUOUS_JOG_DISTANCE,
            handshake_commands: constants::default_handshake_commands(),
        }
    }
}

impl ControllerConfig {
    /// Set the heartbeat period
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the missed heartbeat threshold
    pub fn with_missed_heartbeat_threshold(mut self, threshold: u32) -> Self {
        self.missed_heartbeat_threshold = threshold;
        self
    }

    /// Set the detection timeout
    pub fn with_detection_timeout(mut self, timeout: Duration) -> Self {
        self.detection_timeout = timeout;
        self
    }

    /// Set the handshake command list
    pub fn with_handshake_commands(mut self, commands: Vec<String>) -> Self {
        self.handshake_commands = commands;
        self
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<(), ControllerError> {
        let invalid = |message: &str| {
            Err(ControllerError::Other {
                message: message.to_string(),
            })
        };

        if self.heartbeat_interval.is_zero() {
            return invalid("Heartbeat interval must be > 0");
        }
        if self.missed_heartbeat_threshold == 0 {
            return invalid("Missed heartbeat threshold must be > 0");
        }
        if self.detection_timeout.is_zero() {
            return invalid("Detection timeout must be > 0");
        }
        if self.connect_timeout.is_zero() {
            return invalid("Connect timeout must be > 0");
        }
        if self.error_escalation_threshold == 0 {
            return invalid("Error escalation threshold must be > 0");
        }
        if self.queue_capacity == 0 || self.event_capacity == 0 {
            return invalid("Queue and event capacities must be > 0");
        }
        if !(self.continuous_jog_distance.is_finite() && self.continuous_jog_distance > 0.0) {
            return invalid("Continuous jog distance must be > 0");
        }
        if self
            .handshake_commands
            .iter()
            .any(|c| c.trim().is_empty() || c.contains('\n'))
        {
            return invalid("Handshake commands must be single non-empty lines");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(config.missed_heartbeat_threshold, 3);
        assert_eq!(config.detection_timeout, Duration::from_secs(5));
        assert_eq!(config.handshake_commands, vec!["$I", "$10=511", "$$"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_policy() {
        let config = ControllerConfig::default().with_missed_heartbeat_threshold(0);
        assert!(config.validate().is_err());

        let config = ControllerConfig::default().with_heartbeat_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = ControllerConfig::default().with_handshake_commands(vec!["$$\n$I".into()]);
        assert!(config.validate().is_err());
    }
}
