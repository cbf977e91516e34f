//! grblHAL Error and Alarm Code Decoder
//! Converts numeric error and alarm codes to names, descriptions and severities

use grbllink_core::{ErrorSeverity, FaultCondition};

/// Decode an `error:` code into (name, description)
pub fn decode_error(code: u16) -> (&'static str, &'static str) {
    match code {
        1 => ("Expected command letter", "G-code words consist of a letter and a value. Letter was not found."),
        2 => ("Bad number format", "Missing the expected G-code word value or numeric value format is not valid."),
        3 => ("Invalid statement", "Grbl '$' system command was not recognized or supported."),
        4 => ("Value < 0", "Negative value received for an expected positive value."),
        5 => ("Setting disabled", "Homing cycle failure. Homing is not enabled via settings."),
        6 => ("Value < 3 usec", "Minimum step pulse time must be greater than 3usec."),
        7 => ("EEPROM read fail", "An EEPROM read failed. Auto-restoring affected EEPROM to default values."),
        8 => ("Not idle", "Grbl '$' command cannot be used unless Grbl is IDLE."),
        9 => ("G-code lock", "G-code commands are locked out during alarm or jog state."),
        10 => ("Homing not enabled", "Soft limits cannot be enabled without homing also enabled."),
        11 => ("Line overflow", "Max characters per line exceeded. Received command line was not executed."),
        12 => ("Step rate > 30kHz", "Grbl '$' setting value cause the step rate to exceed the maximum supported."),
        13 => ("Check Door", "Safety door detected as opened and door state initiated."),
        14 => ("Line length exceeded", "Build info or startup line exceeded EEPROM line length limit. Line not stored."),
        15 => ("Travel exceeded", "Jog target exceeds machine travel. Jog command has been ignored."),
        16 => ("Invalid jog command", "Jog command has no '=' or contains prohibited g-code."),
        17 => ("Setting disabled", "Laser mode requires PWM output."),
        18 => ("Reset asserted", "Command aborted by a reset."),
        19 => ("Non positive value", "Value must be greater than zero."),
        20 => ("Unsupported command", "Unsupported or invalid g-code command found in block."),
        21 => ("Modal group violation", "More than one g-code command from same modal group found in block."),
        22 => ("Undefined feed rate", "Feed rate has not yet been set or is undefined."),
        23 => ("Invalid gcode ID:23", "G-code command in block requires an integer value."),
        24 => ("Invalid gcode ID:24", "More than one g-code command that requires axis words found in block."),
        25 => ("Invalid gcode ID:25", "Repeated g-code word found in block."),
        26 => ("Invalid gcode ID:26", "No axis words found in block for g-code command or current modal state which requires them."),
        27 => ("Invalid gcode ID:27", "Line number value is invalid."),
        28 => ("Invalid gcode ID:28", "G-code command is missing a required value word."),
        29 => ("Invalid gcode ID:29", "G59.x work coordinate systems are not supported."),
        30 => ("Invalid gcode ID:30", "G53 only allowed with G0 and G1 motion modes."),
        31 => ("Invalid gcode ID:31", "Axis words found in block when no command or current modal state uses them."),
        32 => ("Invalid gcode ID:32", "G2 and G3 arcs require at least one in-plane axis word."),
        33 => ("Invalid gcode ID:33", "Motion command target is invalid."),
        34 => ("Invalid gcode ID:34", "Arc radius value is invalid."),
        35 => ("Invalid gcode ID:35", "G2 and G3 arcs require at least one in-plane offset word."),
        36 => ("Invalid gcode ID:36", "Unused value words found in block."),
        37 => ("Invalid gcode ID:37", "G43.1 dynamic tool length offset is not assigned to configured tool length axis."),
        38 => ("Invalid gcode ID:38", "Tool number greater than max supported value or undefined tool selected."),
        39 => ("Value out of range", "Value out of range."),
        40 => ("Tool change pending", "G-code command not allowed when tool change is pending."),
        41 => ("Spindle not running", "Spindle not running when motion commanded in CSS or spindle sync mode."),
        42 => ("Illegal plane", "Plane must be ZX for threading."),
        43 => ("Max feed rate exceeded", "Max. feed rate exceeded."),
        44 => ("RPM out of range", "RPM out of range."),
        45 => ("Limit switch engaged", "Only homing is allowed when a limit switch is engaged."),
        46 => ("Homing required", "Home machine to continue."),
        47 => ("Invalid tool", "ATC: current tool is not set. Set current tool with M61."),
        48 => ("Value word conflict", "Value word conflict."),
        49 => ("Self test failed", "Power on self test failed. A hard reset is required."),
        50 => ("E-stop", "Emergency stop active."),
        51 => ("Motor fault", "Motor fault."),
        52 => ("Setting value out of range", "Setting value is out of range."),
        53 => ("Setting disabled", "Setting is not available, possibly due to limited driver support."),
        54 => ("Invalid retract position", "Retract position is less than drill depth."),
        55 => ("Illegal homing configuration", "Attempt to home two auto squared axes at the same time."),
        56 => ("Coordinate system locked", "Cannot write to the coordinate system while it is in use."),
        _ => ("Unknown error", "Error code not recognised by this client."),
    }
}

/// Decode an `ALARM:` code into (name, description)
pub fn decode_alarm(code: u16) -> (&'static str, &'static str) {
    match code {
        1 => ("Hard limit", "Hard limit has been triggered. Machine position is likely lost due to sudden halt. Re-homing is highly recommended."),
        2 => ("Soft limit", "Soft limit alarm. G-code motion target exceeds machine travel. Machine position retained. Alarm may be safely unlocked."),
        3 => ("Abort during cycle", "Reset while in motion. Machine position is likely lost due to sudden halt. Re-homing is highly recommended."),
        4 => ("Probe fail", "Probe fail. Probe is not in the expected initial state before starting probe cycle."),
        5 => ("Probe fail", "Probe fail. Probe did not contact the workpiece within the programmed travel."),
        6 => ("Homing fail", "Homing fail. The active homing cycle was reset."),
        7 => ("Homing fail", "Homing fail. Safety door was opened during homing cycle."),
        8 => ("Homing fail", "Homing fail. Pull off travel failed to clear limit switch. Try increasing pull-off setting or check wiring."),
        9 => ("Homing fail", "Homing fail. Could not find limit switch within search distances. Try increasing max travel, decreasing pull-off distance, or check wiring."),
        10 => ("E-stop", "EStop asserted. Clear and reset."),
        11 => ("Homing required", "Homing required. Execute homing command ($H) to continue."),
        12 => ("Limit switch engaged", "Limit switch engaged. Clear before continuing."),
        13 => ("Probe protection", "Probe protection triggered. Clear before continuing."),
        14 => ("Spindle at speed timeout", "Spindle at speed timeout. Clear before continuing."),
        15 => ("Homing fail", "Homing fail. Could not find second limit switch for auto squared axis within search distances."),
        16 => ("Self test failed", "Power on self-test (POS) failed. Reset required."),
        17 => ("Motor fault", "Motor fault. Clear and reset."),
        18 => ("Homing fail", "Homing fail. Bad configuration."),
        _ => ("Unknown alarm", "Alarm code not recognised by this client."),
    }
}

/// Severity tier of an error code
pub fn error_severity(code: Option<u16>) -> ErrorSeverity {
    match code {
        Some(8 | 9 | 15 | 16 | 45 | 46) => ErrorSeverity::Warning,
        Some(49 | 50 | 51) => ErrorSeverity::Critical,
        _ => ErrorSeverity::Error,
    }
}

/// Severity tier of an alarm code
pub fn alarm_severity(code: Option<u16>) -> ErrorSeverity {
    match code {
        Some(2 | 4 | 5 | 11 | 12 | 13 | 14) => ErrorSeverity::Error,
        _ => ErrorSeverity::Critical,
    }
}

/// Format error message with code and description
pub fn format_error(code: u16) -> String {
    format!("error:{} - {}", code, decode_error(code).1)
}

/// Format alarm message with code and description
pub fn format_alarm(code: u16) -> String {
    format!("ALARM:{} - {}", code, decode_alarm(code).1)
}

/// Build the ledger entry for an `error:` line
pub fn error_condition(code: Option<u16>, raw: &str) -> FaultCondition {
    match code {
        Some(code) => {
            let (name, description) = decode_error(code);
            FaultCondition::new(Some(code), name, description, error_severity(Some(code)))
        }
        None => FaultCondition::new(None, "Error", raw, error_severity(None)),
    }
}

/// Build the ledger entry for an `ALARM:` line
pub fn alarm_condition(code: Option<u16>, raw: &str) -> FaultCondition {
    match code {
        Some(code) => {
            let (name, description) = decode_alarm(code);
            FaultCondition::new(Some(code), name, description, alarm_severity(Some(code)))
        }
        None => FaultCondition::new(None, "Alarm", raw, alarm_severity(None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(decode_error(20).0, "Unsupported command");
        assert_eq!(decode_error(9).0, "G-code lock");
        assert_eq!(decode_alarm(1).0, "Hard limit");
        assert_eq!(decode_alarm(11).0, "Homing required");
    }

    #[test]
    fn test_decode_unknown_codes() {
        assert_eq!(decode_error(250).0, "Unknown error");
        assert_eq!(decode_alarm(250).0, "Unknown alarm");
    }

    #[test]
    fn test_format() {
        assert_eq!(
            format_error(22),
            "error:22 - Feed rate has not yet been set or is undefined."
        );
        assert!(format_alarm(2).starts_with("ALARM:2 - Soft limit alarm"));
    }

    #[test]
    fn test_conditions() {
        let alarm = alarm_condition(Some(1), "ALARM:1");
        assert_eq!(alarm.code, Some(1));
        assert_eq!(alarm.severity, ErrorSeverity::Critical);

        let error = error_condition(None, "error:Invalid gcode ID:24");
        assert_eq!(error.code, None);
        assert_eq!(error.description, "error:Invalid gcode ID:24");
        assert_eq!(error.severity, ErrorSeverity::Error);

        assert_eq!(error_condition(Some(9), "error:9").severity, ErrorSeverity::Warning);
    }
}
