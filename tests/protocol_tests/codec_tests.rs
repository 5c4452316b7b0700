//! Tests for the protocol codec
//!
//! These tests verify:
//! - Command and response framing
//! - UTF-8 validation of keys and values
//! - Rejection of malformed frames
//! - Stream helpers over in-memory buffers

use std::io::Cursor;

use ledgerkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Response, Status, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
use ledgerkv::LedgerError;

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_put_command_layout() {
    let bytes = encode_command(&Command::Put {
        key: "ab".to_string(),
        value: "xyz".to_string(),
    });

    assert_eq!(bytes[0], 0x02);
    assert_eq!(&bytes[1..5], &9u32.to_be_bytes());
    assert_eq!(&bytes[5..9], &2u32.to_be_bytes());
    assert_eq!(&bytes[9..11], b"ab");
    assert_eq!(&bytes[11..], b"xyz");
}

#[test]
fn test_ping_has_empty_payload() {
    let bytes = encode_command(&Command::Ping);
    assert_eq!(bytes, vec![0x04, 0, 0, 0, 0]);
    assert_eq!(decode_command(&bytes).unwrap(), Command::Ping);
}

#[test]
fn test_decode_each_command() {
    let commands = vec![
        Command::Get { key: "k".to_string() },
        Command::Put {
            key: "k".to_string(),
            value: "tab\tand\nnewline".to_string(),
        },
        Command::Put {
            key: String::new(),
            value: String::new(),
        },
        Command::Delete { key: "ключ".to_string() },
    ];

    for command in commands {
        let decoded = decode_command(&encode_command(&command)).unwrap();
        assert_eq!(decoded, command);
    }
}

#[test]
fn test_decode_unknown_command() {
    let result = decode_command(&[0x09, 0, 0, 0, 0]);
    assert!(matches!(result, Err(LedgerError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_header() {
    let result = decode_command(&[0x01, 0, 0]);
    assert!(matches!(result, Err(LedgerError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut bytes = encode_command(&Command::Get { key: "abc".to_string() });
    bytes.pop();
    assert!(matches!(decode_command(&bytes), Err(LedgerError::Protocol(_))));
}

#[test]
fn test_decode_key_length_past_payload() {
    // GET with key_len = 10 but only 1 key byte
    let bytes = vec![0x01, 0, 0, 0, 5, 0, 0, 0, 10, b'k'];
    assert!(matches!(decode_command(&bytes), Err(LedgerError::Protocol(_))));
}

#[test]
fn test_decode_get_with_trailing_bytes() {
    let bytes = vec![0x01, 0, 0, 0, 6, 0, 0, 0, 1, b'k', b'x'];
    assert!(matches!(decode_command(&bytes), Err(LedgerError::Protocol(_))));
}

#[test]
fn test_decode_rejects_invalid_utf8_key() {
    let bytes = vec![0x03, 0, 0, 0, 6, 0, 0, 0, 2, 0xff, 0xfe];
    match decode_command(&bytes) {
        Err(LedgerError::Protocol(msg)) => assert!(msg.contains("UTF-8")),
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_decode_payload_too_large() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert!(matches!(decode_command(&bytes), Err(LedgerError::Protocol(_))));
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_response_layout() {
    let bytes = encode_response(&Response::ok(Some("v".to_string())));
    assert_eq!(bytes, vec![0x00, 0, 0, 0, 1, b'v']);

    let bytes = encode_response(&Response::not_found());
    assert_eq!(bytes.len(), HEADER_SIZE);
    assert_eq!(bytes[0], 0x01);
}

#[test]
fn test_decode_responses() {
    for response in [
        Response::ok(Some("value".to_string())),
        Response::ok(None),
        Response::not_found(),
        Response::error("boom"),
    ] {
        assert_eq!(decode_response(&encode_response(&response)).unwrap(), response);
    }
}

#[test]
fn test_decode_unknown_status() {
    let result = decode_response(&[0x07, 0, 0, 0, 0]);
    assert!(matches!(result, Err(LedgerError::Protocol(_))));
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_stream_commands_back_to_back() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &Command::Put {
        key: "a".to_string(),
        value: "1".to_string(),
    })
    .unwrap();
    write_command(&mut buffer, &Command::Get { key: "a".to_string() }).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(read_command(&mut cursor).unwrap(), Command::Put { .. }));
    assert!(matches!(read_command(&mut cursor).unwrap(), Command::Get { .. }));

    match read_command(&mut cursor) {
        Err(LedgerError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected EOF, got {:?}", other),
    }
}

#[test]
fn test_stream_response() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::error("no")).unwrap();

    let response = read_response(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(response.status, Status::Error);
    assert_eq!(response.payload.as_deref(), Some("no"));
}

#[test]
fn test_response_from_engine_result() {
    let found = Response::from_result(Ok(Some("v".to_string())));
    assert!(found.is_ok());
    assert_eq!(found.payload.as_deref(), Some("v"));

    let missing = Response::from_result(Err(LedgerError::NoSuchKey));
    assert_eq!(missing, Response::not_found());

    let full = Response::from_result(Err(LedgerError::QueueFull { capacity: 4 }));
    assert_eq!(full.status, Status::Error);
    assert!(full.payload.is_some());
}
