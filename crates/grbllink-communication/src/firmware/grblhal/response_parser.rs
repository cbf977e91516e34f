//! grblHAL line classification
//!
//! Every line received from the controller is classified into exactly one
//! [`ProtocolMessage`]. Classification is pure: no state is kept between
//! lines and no line is ever rejected outright, unrecognised input simply
//! ends up as [`ProtocolMessage::Other`].

use grbllink_core::{FirmwareFamily, FirmwareVersion};
use std::fmt;

use super::capabilities::parse_version;

/// A classified controller line
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    /// `<...>` real-time status report, kept raw for the status parser
    StatusReport(String),
    /// `ok`
    Acknowledgment,
    /// `error:<code>`; the code is absent for textual errors
    Error {
        /// Numeric error code
        code: Option<u16>,
        /// Line as received
        raw: String,
    },
    /// `ALARM:<code>`
    Alarm {
        /// Numeric alarm code
        code: Option<u16>,
        /// Line as received
        raw: String,
    },
    /// Firmware welcome banner
    Welcome {
        /// Announced family
        family: FirmwareFamily,
        /// Version token, if it parsed
        version: Option<FirmwareVersion>,
        /// Line as received
        banner: String,
    },
    /// `$<id>=<value>` with an optional `(description)`
    ConfigurationLine {
        /// Setting number
        id: u16,
        /// Raw value
        value: String,
        /// Description supplied by the firmware
        description: Option<String>,
    },
    /// Feedback messages (`[MSG:...]`, `[VER:...]`), echo and everything else
    Other(String),
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusReport(raw) => write!(f, "status:{}", raw),
            Self::Acknowledgment => write!(f, "ok"),
            Self::Error { raw, .. } => write!(f, "{}", raw),
            Self::Alarm { raw, .. } => write!(f, "{}", raw),
            Self::Welcome { banner, .. } => write!(f, "welcome:{}", banner),
            Self::ConfigurationLine { id, value, .. } => write!(f, "setting:${}={}", id, value),
            Self::Other(text) => write!(f, "other:{}", text),
        }
    }
}

/// Classify one line (line terminator already removed)
pub fn decode_line(line: &str) -> ProtocolMessage {
    let line = line.trim();

    if line.starts_with('<') && line.ends_with('>') && line.len() >= 2 {
        return ProtocolMessage::StatusReport(line.to_string());
    }

    if line == "ok" {
        return ProtocolMessage::Acknowledgment;
    }

    if let Some(rest) = strip_prefix_ignore_case(line, "error:") {
        return ProtocolMessage::Error {
            code: rest.trim().parse::<u16>().ok(),
            raw: line.to_string(),
        };
    }

    if let Some(rest) = strip_prefix_ignore_case(line, "alarm:") {
        return ProtocolMessage::Alarm {
            code: rest.trim().parse::<u16>().ok(),
            raw: line.to_string(),
        };
    }

    if let Some(message) = parse_welcome(line) {
        return message;
    }

    if let Some(message) = parse_setting_line(line) {
        return message;
    }

    ProtocolMessage::Other(line.to_string())
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

/// `Grbl 1.1h ['$' for help]` or `GrblHAL 1.1f ['$' or '$HELP' for help]`
fn parse_welcome(line: &str) -> Option<ProtocolMessage> {
    let mut tokens = line.split_whitespace();
    let family = match tokens.next()? {
        "Grbl" => FirmwareFamily::Grbl,
        "GrblHAL" => FirmwareFamily::GrblHal,
        _ => return None,
    };
    let token = tokens.next()?;
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    Some(ProtocolMessage::Welcome {
        family,
        version: parse_version(token),
        banner: line.to_string(),
    })
}

/// `$100=250.000` or `$0=10 (step pulse, usec)`
fn parse_setting_line(line: &str) -> Option<ProtocolMessage> {
    let body = line.strip_prefix('$')?;
    let (id, rest) = body.split_once('=')?;
    let id = id.parse::<u16>().ok()?;

    let (value, description) = match rest.find(" (") {
        Some(pos) if rest.ends_with(')') => (
            rest[..pos].trim(),
            Some(rest[pos + 2..rest.len() - 1].trim().to_string()),
        ),
        _ => (rest.trim(), None),
    };

    Some(ProtocolMessage::ConfigurationLine {
        id,
        value: value.to_string(),
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status_report() {
        let msg = decode_line("<Idle|MPos:0.000,0.000,0.000|FS:0,0>");
        assert!(matches!(msg, ProtocolMessage::StatusReport(ref raw) if raw.starts_with("<Idle")));
    }

    #[test]
    fn test_decode_ok_with_carriage_return() {
        assert_eq!(decode_line("ok\r"), ProtocolMessage::Acknowledgment);
        assert_eq!(decode_line("  ok  "), ProtocolMessage::Acknowledgment);
    }

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            decode_line("error:20"),
            ProtocolMessage::Error {
                code: Some(20),
                raw: "error:20".to_string()
            }
        );
        assert!(matches!(
            decode_line("ERROR:9"),
            ProtocolMessage::Error { code: Some(9), .. }
        ));
        assert!(matches!(
            decode_line("error:Invalid gcode ID:24"),
            ProtocolMessage::Error { code: None, .. }
        ));
    }

    #[test]
    fn test_decode_alarm() {
        assert!(matches!(
            decode_line("ALARM:1"),
            ProtocolMessage::Alarm { code: Some(1), .. }
        ));
        assert!(matches!(
            decode_line("alarm:11"),
            ProtocolMessage::Alarm { code: Some(11), .. }
        ));
        assert!(matches!(
            decode_line("ALARM: Hard/soft limit"),
            ProtocolMessage::Alarm { code: None, .. }
        ));
    }

    #[test]
    fn test_decode_welcome() {
        match decode_line("GrblHAL 1.1f ['$' or '$HELP' for help]") {
            ProtocolMessage::Welcome {
                family, version, ..
            } => {
                assert_eq!(family, FirmwareFamily::GrblHal);
                let version = version.unwrap();
                assert_eq!((version.major, version.minor), (1, 1));
                assert_eq!(version.revision, Some('f'));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            decode_line("Grbl 1.1h ['$' for help]"),
            ProtocolMessage::Welcome {
                family: FirmwareFamily::Grbl,
                ..
            }
        ));
        assert!(matches!(
            decode_line("Grbl is the best"),
            ProtocolMessage::Other(_)
        ));
    }

    #[test]
    fn test_decode_setting_lines() {
        assert_eq!(
            decode_line("$10=511"),
            ProtocolMessage::ConfigurationLine {
                id: 10,
                value: "511".to_string(),
                description: None,
            }
        );
        assert_eq!(
            decode_line("$0=10 (step pulse, usec)"),
            ProtocolMessage::ConfigurationLine {
                id: 0,
                value: "10".to_string(),
                description: Some("step pulse, usec".to_string()),
            }
        );
        assert!(matches!(decode_line("$N0=G54"), ProtocolMessage::Other(_)));
    }

    #[test]
    fn test_decode_other() {
        assert_eq!(
            decode_line("[MSG:'$H'|'$X' to unlock]"),
            ProtocolMessage::Other("[MSG:'$H'|'$X' to unlock]".to_string())
        );
        assert_eq!(decode_line("<"), ProtocolMessage::Other("<".to_string()));
        assert_eq!(decode_line(""), ProtocolMessage::Other(String::new()));
    }
}
