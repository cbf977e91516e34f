//! `$J=` jog command construction

use grbllink_core::{Axis, ControllerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a continuous jog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JogDirection {
    /// Towards increasing coordinates
    Positive,
    /// Towards decreasing coordinates
    Negative,
}

impl JogDirection {
    fn sign(self) -> f64 {
        match self {
            JogDirection::Positive => 1.0,
            JogDirection::Negative => -1.0,
        }
    }
}

/// An incremental, metric jog over one or more axes
#[derive(Debug, Clone, PartialEq)]
pub struct JogCommand {
    moves: Vec<(Axis, f64)>,
    feed_rate: f64,
}

impl JogCommand {
    /// Jog one axis by `distance` mm
    pub fn single(axis: Axis, distance: f64, feed_rate: f64) -> Result<Self, ControllerError> {
        Self::multi(&[(axis, distance)], feed_rate)
    }

    /// Jog several axes in one motion.
    ///
    /// Repeated axes are summed and rounded to the rendered precision;
    /// deltas that round to zero are dropped and a request with nothing
    /// left to move is rejected.
    pub fn multi(moves: &[(Axis, f64)], feed_rate: f64) -> Result<Self, ControllerError> {
        if !(feed_rate.is_finite() && round_to_precision(feed_rate) > 0.0) {
            return Err(ControllerError::JogRejected {
                reason: format!("feed rate must be positive, got {}", feed_rate),
            });
        }

        let mut merged: Vec<(Axis, f64)> = Vec::new();
        for &(axis, distance) in moves {
            if !distance.is_finite() {
                return Err(ControllerError::JogRejected {
                    reason: format!("{} distance is not finite", axis),
                });
            }
            match merged.iter_mut().find(|(a, _)| *a == axis) {
                Some((_, total)) => *total += distance,
                None => merged.push((axis, distance)),
            }
        }
        for (_, distance) in merged.iter_mut() {
            *distance = round_to_precision(*distance);
        }
        merged.retain(|(_, distance)| *distance != 0.0);
        merged.sort_by_key(|(axis, _)| *axis);

        if merged.is_empty() {
            return Err(ControllerError::JogRejected {
                reason: "all jog distances are zero".to_string(),
            });
        }

        Ok(Self {
            moves: merged,
            feed_rate: round_to_precision(feed_rate),
        })
    }

    /// Long jog in one direction, meant to be stopped with a jog cancel
    pub fn continuous(
        axis: Axis,
        direction: JogDirection,
        distance: f64,
        feed_rate: f64,
    ) -> Result<Self, ControllerError> {
        Self::single(axis, direction.sign() * distance.abs(), feed_rate)
    }

    /// Axis moves after merging
    pub fn moves(&self) -> &[(Axis, f64)] {
        &self.moves
    }

    /// Render as a `$J=` line
    pub fn to_gcode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JogCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$J=G91 G21")?;
        for (axis, distance) in &self.moves {
            write!(f, " {}{}", axis, format_number(*distance))?;
        }
        write!(f, " F{}", format_number(self.feed_rate))
    }
}

/// Decimal places written to the controller
const DECIMALS: i32 = 3;

fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMALS);
    (value * scale).round() / scale
}

/// Three decimals without trailing zeros
fn format_number(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_axis_jog() {
        let jog = JogCommand::single(Axis::X, 10.0, 1000.0).unwrap();
        assert_eq!(jog.to_gcode(), "$J=G91 G21 X10 F1000");

        let jog = JogCommand::single(Axis::Z, -0.125, 250.5).unwrap();
        assert_eq!(jog.to_gcode(), "$J=G91 G21 Z-0.125 F250.5");
    }

    #[test]
    fn test_multi_axis_merges_and_drops_zero() {
        let jog = JogCommand::multi(
            &[(Axis::Y, -5.0), (Axis::X, 2.5), (Axis::Z, 0.0), (Axis::X, 2.5)],
            800.0,
        )
        .unwrap();
        assert_eq!(jog.moves(), &[(Axis::X, 5.0), (Axis::Y, -5.0)]);
        assert_eq!(jog.to_gcode(), "$J=G91 G21 X5 Y-5 F800");
    }

    #[test]
    fn test_rejects_all_zero_and_bad_feed() {
        assert!(matches!(
            JogCommand::multi(&[(Axis::X, 0.0), (Axis::Y, 0.0)], 500.0),
            Err(ControllerError::JogRejected { .. })
        ));
        assert!(JogCommand::single(Axis::X, 1.0, 0.0).is_err());
        assert!(JogCommand::single(Axis::X, 1.0, f64::NAN).is_err());
        assert!(JogCommand::single(Axis::X, f64::INFINITY, 100.0).is_err());
    }

    #[test]
    fn test_sub_precision_values_rejected() {
        assert!(matches!(
            JogCommand::single(Axis::X, 0.0001, 100.0),
            Err(ControllerError::JogRejected { .. })
        ));
        assert!(matches!(
            JogCommand::single(Axis::X, 1.0, 0.0001),
            Err(ControllerError::JogRejected { .. })
        ));

        // A tiny delta on one axis does not keep an otherwise valid jog from moving
        let jog = JogCommand::multi(&[(Axis::X, 0.0004), (Axis::Y, 1.0)], 100.0).unwrap();
        assert_eq!(jog.to_gcode(), "$J=G91 G21 Y1 F100");
    }

    #[test]
    fn test_values_rounded_to_three_decimals() {
        let jog = JogCommand::single(Axis::Z, 0.12349, 99.9996).unwrap();
        assert_eq!(jog.moves(), &[(Axis::Z, 0.123)]);
        assert_eq!(jog.to_gcode(), "$J=G91 G21 Z0.123 F100");
    }

    #[test]
    fn test_continuous_jog() {
        let jog = JogCommand::continuous(Axis::Y, JogDirection::Negative, 1000.0, 600.0).unwrap();
        assert_eq!(jog.to_gcode(), "$J=G91 G21 Y-1000 F600");
    }
}
