//! Data models for positions, status, and machine information
//!
//! This module provides:
//! - Position tracking with 3 mandatory and 3 optional axes
//! - Machine mode and the partially-updated status model
//! - Connection phases of the link state machine
//! - Firmware settings, fault ledgers and firmware identity
//! - The copy-out snapshot handed to consumers

pub mod configuration;
pub mod fault;
pub mod firmware;
pub mod phase;
pub mod snapshot;

pub use configuration::{ConfigurationSetting, MachineConfiguration};
pub use fault::{AlarmCondition, ErrorCondition, ErrorSeverity, FaultCondition};
pub use firmware::{FirmwareFamily, FirmwareInfo, FirmwareVersion};
pub use phase::ConnectionPhase;
pub use snapshot::ControllerSnapshot;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
    /// 4th axis
    A,
    /// 5th axis
    B,
    /// 6th axis
    C,
}

impl Axis {
    /// All axes in report order
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// G-code letter for this axis
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
        }
    }

    /// Parse an axis letter (case-insensitive)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            'C' => Some(Axis::C),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Machine coordinate triple with optional rotary axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Z position
    pub z: f64,
    /// A axis (4th axis) position
    pub a: Option<f64>,
    /// B axis (5th axis) position
    pub b: Option<f64>,
    /// C axis (6th axis) position
    pub c: Option<f64>,
}

impl Position {
    /// Create a 3-axis position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Build a position from 3 to 6 coordinates in X, Y, Z, A, B, C order
    pub fn from_coords(coords: &[f64]) -> Option<Self> {
        if !(3..=6).contains(&coords.len()) {
            return None;
        }
        Some(Self {
            x: coords[0],
            y: coords[1],
            z: coords[2],
            a: coords.get(3).copied(),
            b: coords.get(4).copied(),
            c: coords.get(5).copied(),
        })
    }

    /// Value on an axis, if the axis is reported
    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => Some(self.x),
            Axis::Y => Some(self.y),
            Axis::Z => Some(self.z),
            Axis::A => self.a,
            Axis::B => self.b,
            Axis::C => self.c,
        }
    }

    /// Axis-wise `self + sign * other`. A rotary axis missing from `other`
    /// is kept as is; one missing from `self` stays unreported.
    pub fn offset_by(&self, other: &Position, sign: f64) -> Position {
        let combine = |l: Option<f64>, r: Option<f64>| match (l, r) {
            (Some(l), Some(r)) => Some(l + sign * r),
            (l, None) => l,
            (None, Some(_)) => None,
        };
        Position {
            x: self.x + sign * other.x,
            y: self.y + sign * other.y,
            z: self.z + sign * other.z,
            a: combine(self.a, other.a),
            b: combine(self.b, other.b),
            c: combine(self.c, other.c),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z)?;
        for (label, value) in [("A", self.a), ("B", self.b), ("C", self.c)] {
            if let Some(value) = value {
                write!(f, " {}:{:.3}", label, value)?;
            }
        }
        Ok(())
    }
}

/// Operating mode reported at the head of every status report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MachineMode {
    /// Idle, ready for commands
    Idle,
    /// Executing motion
    Run,
    /// Jogging
    Jog,
    /// Feed hold active
    Hold,
    /// Alarm lock
    Alarm,
    /// Safety door open
    Door,
    /// G-code check mode
    Check,
    /// Homing cycle in progress
    Home,
    /// Sleep mode
    Sleep,
    /// Tool change pending (grblHAL)
    Tool,
    /// Token not recognised or nothing reported yet
    #[default]
    Unknown,
}

impl MachineMode {
    /// Map a status report mode token to a mode
    pub fn from_token(token: &str) -> Self {
        match token {
            "Idle" => MachineMode::Idle,
            "Run" => MachineMode::Run,
            "Jog" => MachineMode::Jog,
            "Hold" => MachineMode::Hold,
            "Alarm" => MachineMode::Alarm,
            "Door" => MachineMode::Door,
            "Check" => MachineMode::Check,
            "Home" => MachineMode::Home,
            "Sleep" => MachineMode::Sleep,
            "Tool" => MachineMode::Tool,
            _ => MachineMode::Unknown,
        }
    }

    /// Modes in which a jog may be issued
    pub fn accepts_jog(&self) -> bool {
        matches!(self, MachineMode::Idle | MachineMode::Jog | MachineMode::Check)
    }
}

impl fmt::Display for MachineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineMode::Idle => "Idle",
            MachineMode::Run => "Run",
            MachineMode::Jog => "Jog",
            MachineMode::Hold => "Hold",
            MachineMode::Alarm => "Alarm",
            MachineMode::Door => "Door",
            MachineMode::Check => "Check",
            MachineMode::Home => "Home",
            MachineMode::Sleep => "Sleep",
            MachineMode::Tool => "Tool",
            MachineMode::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Feed, rapid and spindle override percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideValues {
    /// Feed override percentage
    pub feed: u16,
    /// Rapid override percentage
    pub rapid: u16,
    /// Spindle override percentage
    pub spindle: u16,
}

/// Live machine status
///
/// Every field except `mode` is optional: a status report carries only
/// what the firmware chose to send, and [`MachineStatus::merge`] folds
/// such partial reports into the last known state without clearing
/// fields the report left out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MachineStatus {
    /// Operating mode
    pub mode: MachineMode,
    /// Mode sub-state (`Hold:0`, `Door:1`)
    pub substate: Option<u8>,
    /// Machine position (`MPos`)
    pub machine_position: Option<Position>,
    /// Work position (`WPos`)
    pub work_position: Option<Position>,
    /// Work coordinate offset (`WCO`)
    pub work_offset: Option<Position>,
    /// Current feed rate
    pub feed_rate: Option<f64>,
    /// Current spindle speed
    pub spindle_speed: Option<f64>,
    /// Free planner blocks (`Bf` first value)
    pub planner_blocks_free: Option<u16>,
    /// Free serial rx bytes (`Bf` second value)
    pub rx_bytes_free: Option<u32>,
    /// Override percentages (`Ov`)
    pub overrides: Option<OverrideValues>,
    /// When the report was captured
    pub captured_at: Option<DateTime<Utc>>,
}

impl MachineStatus {
    /// Fold a newer partial report into this status.
    ///
    /// The mode and its sub-state always come from `update`; every other
    /// field is replaced only when `update` reports it.
    pub fn merge(&mut self, update: &MachineStatus) {
        self.mode = update.mode;
        self.substate = update.substate;
        if update.machine_position.is_some() {
            self.machine_position = update.machine_position;
        }
        if update.work_position.is_some() {
            self.work_position = update.work_position;
        }
        if update.work_offset.is_some() {
            self.work_offset = update.work_offset;
        }
        if update.feed_rate.is_some() {
            self.feed_rate = update.feed_rate;
        }
        if update.spindle_speed.is_some() {
            self.spindle_speed = update.spindle_speed;
        }
        if update.planner_blocks_free.is_some() {
            self.planner_blocks_free = update.planner_blocks_free;
        }
        if update.rx_bytes_free.is_some() {
            self.rx_bytes_free = update.rx_bytes_free;
        }
        if update.overrides.is_some() {
            self.overrides = update.overrides;
        }
        if update.captured_at.is_some() {
            self.captured_at = update.captured_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_coords() {
        assert!(Position::from_coords(&[1.0, 2.0]).is_none());
        assert!(Position::from_coords(&[0.0; 7]).is_none());

        let pos = Position::from_coords(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.a, Some(4.0));
        assert_eq!(pos.b, None);
        assert_eq!(pos.get(Axis::A), Some(4.0));
        assert_eq!(pos.get(Axis::C), None);
    }

    #[test]
    fn test_position_offset() {
        let mpos = Position::new(10.0, 20.0, 30.0);
        let wco = Position::new(1.0, 2.0, 3.0);
        assert_eq!(mpos.offset_by(&wco, -1.0), Position::new(9.0, 18.0, 27.0));
        assert_eq!(
            Position::new(9.0, 18.0, 27.0).offset_by(&wco, 1.0),
            Position::new(10.0, 20.0, 30.0)
        );
    }

    #[test]
    fn test_mode_tokens() {
        assert_eq!(MachineMode::from_token("Idle"), MachineMode::Idle);
        assert_eq!(MachineMode::from_token("Tool"), MachineMode::Tool);
        assert_eq!(MachineMode::from_token("Dancing"), MachineMode::Unknown);
        assert!(MachineMode::Check.accepts_jog());
        assert!(!MachineMode::Run.accepts_jog());
        assert!(!MachineMode::Alarm.accepts_jog());
    }

    #[test]
    fn test_merge_keeps_unreported_fields() {
        let mut status = MachineStatus {
            mode: MachineMode::Idle,
            machine_position: Some(Position::new(1.0, 2.0, 3.0)),
            planner_blocks_free: Some(15),
            rx_bytes_free: Some(128),
            ..Default::default()
        };

        let update = MachineStatus {
            mode: MachineMode::Run,
            feed_rate: Some(500.0),
            ..Default::default()
        };
        status.merge(&update);

        assert_eq!(status.mode, MachineMode::Run);
        assert_eq!(status.machine_position, Some(Position::new(1.0, 2.0, 3.0)));
        assert_eq!(status.planner_blocks_free, Some(15));
        assert_eq!(status.rx_bytes_free, Some(128));
        assert_eq!(status.feed_rate, Some(500.0));
    }

    #[test]
    fn test_merge_replaces_substate_with_mode() {
        let mut status = MachineStatus {
            mode: MachineMode::Hold,
            substate: Some(0),
            ..Default::default()
        };
        status.merge(&MachineStatus {
            mode: MachineMode::Idle,
            ..Default::default()
        });
        assert_eq!(status.mode, MachineMode::Idle);
        assert_eq!(status.substate, None);
    }
}
