//! grblHAL Status Report Parsing
//!
//! Decodes `<Mode|Field:...|Field:...>` reports into a [`MachineStatus`]
//! holding only the fields the report carried. A malformed field is
//! dropped on its own; it never invalidates the rest of the report, and
//! unknown fields are skipped so newer firmware keeps working.

use chrono::Utc;
use grbllink_core::{MachineMode, MachineStatus, OverrideValues, Position};

/// Status report parser
pub struct StatusParser;

impl StatusParser {
    /// Parse a full `<...>` report. Returns `None` only if the line is not
    /// delimited like a status report.
    pub fn parse(line: &str) -> Option<MachineStatus> {
        let body = line.trim().strip_prefix('<')?.strip_suffix('>')?;
        let mut parts = body.split('|');

        let (mode, substate) = Self::parse_mode(parts.next().unwrap_or_default());
        let mut status = MachineStatus {
            mode,
            substate,
            captured_at: Some(Utc::now()),
            ..Default::default()
        };

        for part in parts {
            let Some((tag, value)) = part.split_once(':') else {
                continue;
            };
            match tag.trim() {
                "MPos" => status.machine_position = Self::parse_position(value),
                "WPos" => status.work_position = Self::parse_position(value),
                "WCO" => status.work_offset = Self::parse_position(value),
                "FS" => {
                    if let Some((feed, spindle)) = Self::parse_pair(value) {
                        status.feed_rate = Some(feed);
                        status.spindle_speed = Some(spindle);
                    }
                }
                "F" => status.feed_rate = Self::parse_number(value),
                "Bf" => {
                    if let Some((blocks, bytes)) = Self::parse_pair(value) {
                        status.planner_blocks_free = Self::to_count(blocks);
                        status.rx_bytes_free = Self::to_count(bytes);
                    }
                }
                "Ov" => status.overrides = Self::parse_overrides(value),
                _ => {}
            }
        }

        // Derive the missing position from the offset, within this report only
        match (status.machine_position, status.work_position, status.work_offset) {
            (Some(mpos), None, Some(wco)) => status.work_position = Some(mpos.offset_by(&wco, -1.0)),
            (None, Some(wpos), Some(wco)) => status.machine_position = Some(wpos.offset_by(&wco, 1.0)),
            _ => {}
        }

        Some(status)
    }

    /// Split `Hold:0` into mode and sub-state
    pub fn parse_mode(token: &str) -> (MachineMode, Option<u8>) {
        let token = token.trim();
        match token.split_once(':') {
            Some((mode, sub)) => (MachineMode::from_token(mode), sub.trim().parse().ok()),
            None => (MachineMode::from_token(token), None),
        }
    }

    /// Parse `x,y,z[,a[,b[,c]]]`; any bad coordinate rejects the whole field
    pub fn parse_position(value: &str) -> Option<Position> {
        let coords = value
            .split(',')
            .map(|s| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        Position::from_coords(&coords)
    }

    fn parse_number(value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn parse_pair(value: &str) -> Option<(f64, f64)> {
        let (first, second) = value.split_once(',')?;
        // Extra trailing values (grblHAL may append) are ignored
        let second = second.split(',').next()?;
        Some((Self::parse_number(first)?, Self::parse_number(second)?))
    }

    fn to_count<T: TryFrom<u64>>(value: f64) -> Option<T> {
        if value < 0.0 || value.fract() != 0.0 {
            return None;
        }
        T::try_from(value as u64).ok()
    }

    fn parse_overrides(value: &str) -> Option<OverrideValues> {
        let parts = value
            .split(',')
            .map(|p| p.trim().parse::<u16>().ok())
            .collect::<Option<Vec<u16>>>()?;
        match parts.as_slice() {
            [feed, rapid, spindle] => Some(OverrideValues {
                feed: *feed,
                rapid: *rapid,
                spindle: *spindle,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_report() {
        let status =
            StatusParser::parse("<Idle|MPos:1.000,2.000,3.000|FS:0,0|Bf:15,128>").unwrap();

        assert_eq!(status.mode, MachineMode::Idle);
        assert_eq!(status.machine_position, Some(Position::new(1.0, 2.0, 3.0)));
        assert_eq!(status.feed_rate, Some(0.0));
        assert_eq!(status.spindle_speed, Some(0.0));
        assert_eq!(status.planner_blocks_free, Some(15));
        assert_eq!(status.rx_bytes_free, Some(128));
        assert!(status.work_position.is_none());
        assert!(status.captured_at.is_some());
    }

    #[test]
    fn test_parse_substate_and_rotary_axes() {
        let status = StatusParser::parse("<Hold:0|WPos:1,2,3,90.5|F:1200>").unwrap();
        assert_eq!(status.mode, MachineMode::Hold);
        assert_eq!(status.substate, Some(0));
        let wpos = status.work_position.unwrap();
        assert_eq!(wpos.a, Some(90.5));
        assert_eq!(status.feed_rate, Some(1200.0));
        assert!(status.spindle_speed.is_none());
    }

    #[test]
    fn test_derives_work_position_from_offset() {
        let status =
            StatusParser::parse("<Run|MPos:10.000,20.000,30.000|WCO:1.000,2.000,3.000>").unwrap();
        assert_eq!(status.work_position, Some(Position::new(9.0, 18.0, 27.0)));
        assert_eq!(status.work_offset, Some(Position::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_malformed_fields_are_dropped() {
        let status =
            StatusParser::parse("<Jog|MPos:1.0,abc,3.0|FS:100|Bf:-1,12|Ov:100,100>").unwrap();
        assert_eq!(status.mode, MachineMode::Jog);
        assert!(status.machine_position.is_none());
        assert!(status.feed_rate.is_none());
        assert!(status.planner_blocks_free.is_none());
        assert_eq!(status.rx_bytes_free, Some(12));
        assert!(status.overrides.is_none());
    }

    #[test]
    fn test_unknown_mode_and_fields() {
        let status = StatusParser::parse("<Warp|Pn:XYZ|Ln:99|A:SFM|MPos:0,0,0>").unwrap();
        assert_eq!(status.mode, MachineMode::Unknown);
        assert_eq!(status.machine_position, Some(Position::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_overrides() {
        let status = StatusParser::parse("<Idle|Ov:120,50,80>").unwrap();
        assert_eq!(
            status.overrides,
            Some(OverrideValues {
                feed: 120,
                rapid: 50,
                spindle: 80
            })
        );
    }

    #[test]
    fn test_rejects_non_reports() {
        assert!(StatusParser::parse("ok").is_none());
        assert!(StatusParser::parse("<Idle|MPos:0,0,0").is_none());
    }
}
