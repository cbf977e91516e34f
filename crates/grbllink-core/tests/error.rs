use grbllink_core::{ConnectionError, ControllerError, Error, FirmwareError};

#[test]
fn test_controller_error_display() {
    let err = ControllerError::CommandRejected {
        code: Some(20),
        message: "Unsupported or invalid g-code command found in block.".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Command rejected (error:20): Unsupported or invalid g-code command found in block."
    );

    let err = ControllerError::CommandRejected {
        code: None,
        message: "Invalid gcode ID:24".to_string(),
    };
    assert_eq!(err.to_string(), "Command rejected: Invalid gcode ID:24");

    let err = ControllerError::NotReady {
        phase: "Alarm".to_string(),
        command: "G0 X10".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Controller not ready (Alarm): cannot send 'G0 X10'"
    );

    let err = ControllerError::DetectionTimeout { timeout_ms: 5000 };
    assert_eq!(err.to_string(), "Controller not detected within 5000ms");
}

#[test]
fn test_connection_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
    let err: ConnectionError = io.into();
    assert_eq!(err.to_string(), "I/O error: reset by peer");
}

#[test]
fn test_unified_error_classification() {
    let err: Error = ControllerError::LivenessTimeout { missed: 3 }.into();
    assert!(err.is_timeout());
    assert!(err.is_controller_error());

    let err: Error = ConnectionError::ConnectionTimeout { timeout_ms: 100 }.into();
    assert!(err.is_timeout());
    assert!(err.is_connection_error());

    let err: Error = FirmwareError::ResponseParseError {
        reason: "unreadable status report '<Idle|MPos:x>'".to_string(),
    }
    .into();
    assert!(err.is_firmware_error());
    assert!(!err.is_timeout());
    assert_eq!(
        err.to_string(),
        "Failed to parse firmware response: unreadable status report '<Idle|MPos:x>'"
    );

    let err = Error::other("boom");
    assert_eq!(err.to_string(), "boom");
}
