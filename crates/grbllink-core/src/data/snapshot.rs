use std::sync::Arc;

use super::{ConnectionPhase, FaultCondition, FirmwareInfo, MachineConfiguration, MachineStatus};

/// Immutable copy of the controller state handed to consumers
#[derive(Debug, Clone, Default)]
pub struct ControllerSnapshot {
    /// Current connection phase
    pub phase: ConnectionPhase,
    /// Address of the active or last connection
    pub address: Option<String>,
    /// Merged machine status
    pub status: MachineStatus,
    /// Firmware settings reported so far
    pub configuration: Arc<MachineConfiguration>,
    /// Active alarms
    pub alarms: Vec<FaultCondition>,
    /// Recorded command errors
    pub errors: Vec<FaultCondition>,
    /// Identified firmware
    pub firmware: Option<FirmwareInfo>,
    /// Last transport, detection or liveness failure
    pub last_error: Option<String>,
    /// Commands queued or in flight
    pub pending_commands: usize,
}

impl ControllerSnapshot {
    /// True when an alarm is recorded or the machine reports alarm mode
    pub fn in_alarm(&self) -> bool {
        !self.alarms.is_empty() || self.phase == ConnectionPhase::Alarm
    }
}
