//! Names of the standard grbl and grblHAL `$` settings.
//!
//! Firmware since grbl 1.1 sends bare `$id=value` lines, so descriptions
//! for the configuration model come from this table.

/// Description of a setting number, if it is a standard one
pub fn setting_description(id: u16) -> Option<&'static str> {
    let description = match id {
        0 => "Step pulse time, microseconds",
        1 => "Step idle delay, milliseconds",
        2 => "Step pulse invert, mask",
        3 => "Step direction invert, mask",
        4 => "Invert step enable pin(s)",
        5 => "Invert limit pins",
        6 => "Invert probe pin",
        10 => "Status report options, mask",
        11 => "Junction deviation, mm",
        12 => "Arc tolerance, mm",
        13 => "Report in inches, boolean",
        14 => "Invert control pins, mask",
        15 => "Invert coolant pins, mask",
        16 => "Invert spindle signals, mask",
        17 => "Pullup disable control pins, mask",
        18 => "Pullup disable limit pins, mask",
        19 => "Pullup disable probe pin, boolean",
        20 => "Soft limits enable, boolean",
        21 => "Hard limits enable, boolean",
        22 => "Homing cycle enable",
        23 => "Homing direction invert, mask",
        24 => "Homing locate feed rate, mm/min",
        25 => "Homing search seek rate, mm/min",
        26 => "Homing switch debounce delay, milliseconds",
        27 => "Homing switch pull-off distance, mm",
        28 => "G73 retract distance, mm",
        29 => "Pulse delay, microseconds",
        30 => "Maximum spindle speed, RPM",
        31 => "Minimum spindle speed, RPM",
        32 => "Laser-mode enable, boolean",
        33 => "Spindle PWM frequency, Hz",
        34 => "Spindle PWM off value, percent",
        35 => "Spindle PWM min value, percent",
        36 => "Spindle PWM max value, percent",
        37 => "Steppers deenergize, mask",
        39 => "Enable legacy RT commands, boolean",
        40 => "Limit jog commands, boolean",
        43 => "Homing passes",
        44..=49 => return Some(homing_cycle_description(id)),
        60 => "Restore overrides, boolean",
        62 => "Sleep enable, boolean",
        63 => "Feed hold actions, mask",
        64 => "Force init alarm, boolean",
        65 => "Probing feed override, boolean",
        100..=105 => return Some(AXIS_SETTINGS[0][usize::from(id % 10)]),
        110..=115 => return Some(AXIS_SETTINGS[1][usize::from(id % 10)]),
        120..=125 => return Some(AXIS_SETTINGS[2][usize::from(id % 10)]),
        130..=135 => return Some(AXIS_SETTINGS[3][usize::from(id % 10)]),
        _ => return None,
    };
    Some(description)
}

fn homing_cycle_description(id: u16) -> &'static str {
    match id {
        44 => "Axes homing, first pass",
        45 => "Axes homing, second pass",
        46 => "Axes homing, third pass",
        47 => "Axes homing, fourth pass",
        48 => "Axes homing, fifth pass",
        _ => "Axes homing, sixth pass",
    }
}

const AXIS_SETTINGS: [[&str; 6]; 4] = [
    [
        "X-axis travel resolution, step/mm",
        "Y-axis travel resolution, step/mm",
        "Z-axis travel resolution, step/mm",
        "A-axis travel resolution, step/mm",
        "B-axis travel resolution, step/mm",
        "C-axis travel resolution, step/mm",
    ],
    [
        "X-axis maximum rate, mm/min",
        "Y-axis maximum rate, mm/min",
        "Z-axis maximum rate, mm/min",
        "A-axis maximum rate, mm/min",
        "B-axis maximum rate, mm/min",
        "C-axis maximum rate, mm/min",
    ],
    [
        "X-axis acceleration, mm/sec^2",
        "Y-axis acceleration, mm/sec^2",
        "Z-axis acceleration, mm/sec^2",
        "A-axis acceleration, mm/sec^2",
        "B-axis acceleration, mm/sec^2",
        "C-axis acceleration, mm/sec^2",
    ],
    [
        "X-axis maximum travel, mm",
        "Y-axis maximum travel, mm",
        "Z-axis maximum travel, mm",
        "A-axis maximum travel, mm",
        "B-axis maximum travel, mm",
        "C-axis maximum travel, mm",
    ],
];

/// Description for a reported setting: the firmware's own text wins,
/// then the table, then a generic label.
pub fn describe_setting(id: u16, reported: Option<&str>) -> String {
    match reported.filter(|d| !d.is_empty()) {
        Some(description) => description.to_string(),
        None => setting_description(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Setting ${}", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_settings() {
        assert_eq!(setting_description(10), Some("Status report options, mask"));
        assert_eq!(
            setting_description(100),
            Some("X-axis travel resolution, step/mm")
        );
        assert_eq!(setting_description(112), Some("Z-axis maximum rate, mm/min"));
        assert_eq!(
            setting_description(123),
            Some("A-axis acceleration, mm/sec^2")
        );
        assert_eq!(setting_description(135), Some("C-axis maximum travel, mm"));
        assert_eq!(setting_description(45), Some("Axes homing, second pass"));
        assert_eq!(setting_description(7), None);
    }

    #[test]
    fn test_describe_setting_precedence() {
        assert_eq!(describe_setting(0, Some("step pulse, usec")), "step pulse, usec");
        assert_eq!(describe_setting(0, None), "Step pulse time, microseconds");
        assert_eq!(describe_setting(0, Some("")), "Step pulse time, microseconds");
        assert_eq!(describe_setting(399, None), "Setting $399");
    }
}
