//! Line protocol behaviour: classification, status decoding and framing

use grbllink_communication::firmware::grblhal::{decode_error, decode_line, error_condition};
use grbllink_communication::{LineFramer, ProtocolMessage, StatusParser};
use grbllink_core::{FirmwareFamily, MachineMode, Position};
use proptest::prelude::*;

#[test]
fn test_status_line_decodes_every_field() {
    let status = StatusParser::parse(
        "<Idle|MPos:0.000,1.500,-2.250|WPos:0.000,1.500,-2.250|FS:500,12000|Bf:15,128>",
    )
    .unwrap();

    assert_eq!(status.mode, MachineMode::Idle);
    assert_eq!(status.machine_position, Some(Position::new(0.0, 1.5, -2.25)));
    assert_eq!(status.work_position, Some(Position::new(0.0, 1.5, -2.25)));
    assert_eq!(status.feed_rate, Some(500.0));
    assert_eq!(status.spindle_speed, Some(12000.0));
    assert_eq!(status.planner_blocks_free, Some(15));
    assert_eq!(status.rx_bytes_free, Some(128));
}

#[test]
fn test_malformed_field_keeps_the_rest() {
    let status = StatusParser::parse("<Run|MPos:1,abc,3|FS:800,0>").unwrap();
    assert_eq!(status.mode, MachineMode::Run);
    assert!(status.machine_position.is_none());
    assert_eq!(status.feed_rate, Some(800.0));
}

#[test]
fn test_classification_covers_each_kind() {
    assert_eq!(decode_line("ok"), ProtocolMessage::Acknowledgment);
    assert!(matches!(
        decode_line("<Idle|MPos:0,0,0>"),
        ProtocolMessage::StatusReport(_)
    ));
    assert!(matches!(
        decode_line("error:20"),
        ProtocolMessage::Error { code: Some(20), .. }
    ));
    assert!(matches!(
        decode_line("ALARM:1"),
        ProtocolMessage::Alarm { code: Some(1), .. }
    ));
    assert!(matches!(
        decode_line("GrblHAL 1.1f ['$' or '$HELP' for help]"),
        ProtocolMessage::Welcome {
            family: FirmwareFamily::GrblHal,
            ..
        }
    ));
    assert_eq!(
        decode_line("$110=5000.000"),
        ProtocolMessage::ConfigurationLine {
            id: 110,
            value: "5000.000".to_string(),
            description: None,
        }
    );
    assert_eq!(
        decode_line("[MSG:Caution: Unlocked]"),
        ProtocolMessage::Other("[MSG:Caution: Unlocked]".to_string())
    );
}

#[test]
fn test_unknown_error_code_still_classified() {
    let (name, message) = decode_error(250);
    assert!(!name.is_empty());
    assert!(!message.is_empty());

    let condition = error_condition(Some(250), "error:250");
    assert_eq!(condition.code, Some(250));
}

#[test]
fn test_framer_handles_split_crlf() {
    let mut framer = LineFramer::new();
    assert!(framer.push(b"<Idle|MPos:0,0,0>\r").is_empty());
    let lines = framer.push(b"\nok\r\n\r\nerror:");
    assert_eq!(lines, vec!["<Idle|MPos:0,0,0>".to_string(), "ok".to_string()]);
    assert_eq!(framer.pending(), "error:".len());
    assert_eq!(framer.push(b"9\n"), vec!["error:9".to_string()]);
}

proptest! {
    #[test]
    fn prop_decode_is_total_and_pure(line in ".{0,120}") {
        let first = decode_line(&line);
        prop_assert_eq!(first, decode_line(&line));
    }

    #[test]
    fn prop_status_parser_never_panics(body in "[A-Za-z0-9:,.|\\-]{0,80}") {
        let line = format!("<{}>", body);
        prop_assert!(StatusParser::parse(&line).is_some());
    }

    #[test]
    fn prop_framer_is_chunking_independent(
        text in "[a-z<>|:,0-9\\r\\n]{0,200}",
        split in 0usize..200,
    ) {
        let bytes = text.as_bytes();
        let split = split.min(bytes.len());

        let mut whole = LineFramer::new();
        let expected = whole.push(bytes);

        let mut chunked = LineFramer::new();
        let mut lines = chunked.push(&bytes[..split]);
        lines.extend(chunked.push(&bytes[split..]));

        prop_assert_eq!(lines, expected);
    }
}
