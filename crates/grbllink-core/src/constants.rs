//! Protocol bytes and default timing policy.

use std::time::Duration;

/// Real-time status query
pub const STATUS_QUERY: u8 = b'?';
/// Real-time feed hold
pub const FEED_HOLD: u8 = b'!';
/// Real-time cycle start / resume
pub const CYCLE_START: u8 = b'~';
/// Real-time soft reset (Ctrl-X)
pub const SOFT_RESET: u8 = 0x18;
/// Real-time jog cancel
pub const JOG_CANCEL: u8 = 0x85;
/// grblHAL: status report with every field included
pub const COMPLETE_STATUS_QUERY: u8 = 0x87;
/// Feed override reset to 100%
pub const FEED_OVERRIDE_RESET: u8 = 0x90;
/// Feed override +10%
pub const FEED_OVERRIDE_PLUS_10: u8 = 0x91;
/// Feed override -10%
pub const FEED_OVERRIDE_MINUS_10: u8 = 0x92;
/// Rapid override 100%
pub const RAPID_OVERRIDE_RESET: u8 = 0x95;
/// Spindle override reset to 100%
pub const SPINDLE_OVERRIDE_RESET: u8 = 0x99;
/// Spindle stop (only in hold)
pub const SPINDLE_STOP: u8 = 0x9E;

/// Unlock an alarm lock
pub const UNLOCK_COMMAND: &str = "$X";
/// Run the homing cycle
pub const HOME_COMMAND: &str = "$H";
/// Dump all settings
pub const SETTINGS_COMMAND: &str = "$$";
/// Build info / capability query
pub const BUILD_INFO_COMMAND: &str = "$I";
/// Ask for every optional status report field
pub const FULL_STATUS_MASK_COMMAND: &str = "$10=511";

/// Heartbeat period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);
/// Unanswered heartbeats before the link is declared dead
pub const DEFAULT_MISSED_HEARTBEAT_THRESHOLD: u32 = 3;
/// Time allowed for a banner or status report after the transport opens
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed to open the transport
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Consecutive `error:` responses that put the controller in `ControllerError`
pub const DEFAULT_ERROR_ESCALATION_THRESHOLD: u32 = 3;
/// Commands that may wait in the command channel
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;
/// Broadcast capacity of the event bus
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;
/// Travel requested by a continuous jog, in millimetres
pub const DEFAULT_CONTINUOUS_JOG_DISTANCE: f64 = 1000.0;
/// Longest line grbl accepts, newline excluded
pub const MAX_LINE_LENGTH: usize = 255;

/// Handshake commands sent after detection
pub fn default_handshake_commands() -> Vec<String> {
    vec![
        BUILD_INFO_COMMAND.to_string(),
        FULL_STATUS_MASK_COMMAND.to_string(),
        SETTINGS_COMMAND.to_string(),
    ]
}

/// Bytes the firmware handles immediately instead of buffering as a line
pub fn is_realtime_byte(byte: u8) -> bool {
    matches!(byte, STATUS_QUERY | FEED_HOLD | CYCLE_START | SOFT_RESET) || byte >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_bytes() {
        assert!(is_realtime_byte(b'?'));
        assert!(is_realtime_byte(SOFT_RESET));
        assert!(is_realtime_byte(JOG_CANCEL));
        assert!(is_realtime_byte(FEED_OVERRIDE_RESET));
        assert!(!is_realtime_byte(b'G'));
        assert!(!is_realtime_byte(b'\n'));
    }
}
