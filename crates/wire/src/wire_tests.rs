// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::{AnalyzerRequest, RequestId, ResponseStatus};

#[test]
fn encode_returns_json_without_length_prefix() {
    let request = AnalyzerRequest::StaticAnalyze {
        request_id: RequestId::new("req-1"),
        model: "openai_gpt-4o".to_string(),
        app_number: 1,
        source_dir: "/src".to_string(),
        tools: vec!["bandit".to_string()],
        options: Default::default(),
    };
    let encoded = encode(&request).expect("encode failed");
    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {json_str}");
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_rejects_frame_over_ceiling() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_, _)));
}

#[test]
fn decode_round_trips_response_status() {
    let bytes = encode(&ResponseStatus::NoIssues).expect("encode failed");
    let back: ResponseStatus = decode(&bytes).expect("decode failed");
    assert_eq!(back, ResponseStatus::NoIssues);
}
