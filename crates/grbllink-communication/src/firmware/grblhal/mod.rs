//! grblHAL Firmware Support
//!
//! Line protocol of grblHAL and classic grbl 1.1: line classification,
//! status report decoding, error/alarm and settings catalogs, `$I`
//! capability parsing and jog command construction.

pub mod capabilities;
pub mod error_decoder;
pub mod jog;
pub mod response_parser;
pub mod settings;
pub mod status_parser;

pub use capabilities::{apply_feedback, parse_feedback, parse_version, Feedback};
pub use error_decoder::{alarm_condition, decode_alarm, decode_error, error_condition};
pub use jog::{JogCommand, JogDirection};
pub use response_parser::{decode_line, ProtocolMessage};
pub use settings::{describe_setting, setting_description};
pub use status_parser::StatusParser;
