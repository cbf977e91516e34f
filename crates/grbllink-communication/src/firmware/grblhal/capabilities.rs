//! Firmware version and `$I` capability parsing
//!
//! `$I` answers with bracketed feedback lines:
//!
//! ```text
//! [VER:1.1f.20230919:My machine]
//! [OPT:VNMSL,35,1024,3,0]
//! [FIRMWARE:grblHAL]
//! [AXS:4:XYZA]
//! ```

use grbllink_core::{FirmwareFamily, FirmwareInfo, FirmwareVersion};

/// A bracketed feedback line
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// `[VER:<version>:<name>]`
    Version {
        /// Parsed version with build date
        version: Option<FirmwareVersion>,
        /// Machine name, if configured
        name: Option<String>,
    },
    /// `[OPT:<letters>,<blocks>,<rx>[,<axes>...]]`
    Options {
        /// Option letters
        letters: String,
        /// Planner block count
        planner_blocks: Option<u16>,
        /// Serial rx buffer size
        rx_buffer_size: Option<u32>,
        /// Axis count (grblHAL)
        axis_count: Option<u8>,
    },
    /// `[FIRMWARE:grblHAL]`
    Firmware(String),
    /// `[AXS:<count>:<letters>]`
    Axes {
        /// Number of axes
        count: u8,
    },
    /// `[MSG:...]`
    Message(String),
    /// Any other bracketed line (`[GC:...]`, `[PRB:...]`, ...)
    Other(String),
}

/// Parse `1.1f` or `1.1f.20230919` into a version
pub fn parse_version(token: &str) -> Option<FirmwareVersion> {
    let (major, rest) = token.split_once('.')?;
    let major = major.parse::<u32>().ok()?;

    let (minor_part, build) = match rest.split_once('.') {
        Some((minor, build)) if !build.is_empty() => (minor, Some(build.to_string())),
        Some((minor, _)) => (minor, None),
        None => (rest, None),
    };

    let digits_end = minor_part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(minor_part.len());
    let minor = minor_part[..digits_end].parse::<u32>().ok()?;
    let revision = minor_part[digits_end..]
        .chars()
        .next()
        .filter(|c| c.is_ascii_alphabetic());

    Some(FirmwareVersion {
        major,
        minor,
        revision,
        build,
    })
}

/// Parse a bracketed feedback line; `None` if the line is not bracketed
pub fn parse_feedback(line: &str) -> Option<Feedback> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let (tag, body) = inner.split_once(':').unwrap_or((inner, ""));

    let feedback = match tag {
        "VER" => {
            let (version, name) = body.split_once(':').unwrap_or((body, ""));
            Feedback::Version {
                version: parse_version(version),
                name: Some(name.trim())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            }
        }
        "OPT" => {
            let mut parts = body.split(',');
            let letters = parts.next().unwrap_or_default().to_string();
            let planner_blocks = parts.next().and_then(|p| p.trim().parse().ok());
            let rx_buffer_size = parts.next().and_then(|p| p.trim().parse().ok());
            let axis_count = parts.next().and_then(|p| p.trim().parse().ok());
            Feedback::Options {
                letters,
                planner_blocks,
                rx_buffer_size,
                axis_count,
            }
        }
        "FIRMWARE" => Feedback::Firmware(body.trim().to_string()),
        "AXS" => match body.split(':').next().and_then(|c| c.parse().ok()) {
            Some(count) => Feedback::Axes { count },
            None => Feedback::Other(inner.to_string()),
        },
        "MSG" => Feedback::Message(body.trim().to_string()),
        _ => Feedback::Other(inner.to_string()),
    };
    Some(feedback)
}

/// Fold capability feedback into the firmware record.
///
/// Returns true when the record changed. Capability lines that arrive
/// before a banner create a record; `[FIRMWARE:grblHAL]` upgrades the family.
pub fn apply_feedback(info: &mut Option<FirmwareInfo>, feedback: &Feedback) -> bool {
    match feedback {
        Feedback::Version {
            version: Some(version),
            ..
        } => {
            let info = record(info);
            info.version = Some(version.clone());
            true
        }
        Feedback::Options {
            letters,
            planner_blocks,
            rx_buffer_size,
            axis_count,
        } => {
            let info = record(info);
            info.options = Some(letters.clone());
            info.planner_blocks = *planner_blocks;
            info.rx_buffer_size = *rx_buffer_size;
            if axis_count.is_some() {
                info.axis_count = *axis_count;
            }
            true
        }
        Feedback::Firmware(name) if name.eq_ignore_ascii_case("grblHAL") => {
            record(info).family = FirmwareFamily::GrblHal;
            true
        }
        Feedback::Axes { count } => {
            record(info).axis_count = Some(*count);
            true
        }
        _ => false,
    }
}

fn record(info: &mut Option<FirmwareInfo>) -> &mut FirmwareInfo {
    info.get_or_insert_with(|| FirmwareInfo::new(FirmwareFamily::Grbl, None, String::new()))
}
