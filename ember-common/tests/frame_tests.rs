// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the wire-frame codec and the fixed-layout protocol pieces.

mod common;

use common::{build_frame, corrupted, data_frame, MockLink, TEST_IV};
use ember_common::protocol::{
    ReplyStatus, StartInfo, FRAME_LEN, PAYLOAD_LEN, REPLY_MARKER,
};
use ember_common::{FrameError, FrameType};

fn patterned_payload() -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = (i % 253) as u8;
    }
    payload
}

// =============================================================================
// read_frame
// =============================================================================

#[test]
fn test_read_frame_roundtrip() {
    let payload = patterned_payload();
    let mut link = MockLink::new();
    link.push(&build_frame(FrameType::Data, &payload));

    let mut out = [0u8; PAYLOAD_LEN];
    common::codec()
        .read_frame(&mut link, FrameType::Data, &mut out)
        .unwrap();
    assert_eq!(out, payload);
}

#[test]
fn test_read_frame_wire_length() {
    assert_eq!(data_frame(&[1, 2, 3]).len(), FRAME_LEN);
    assert_eq!(FRAME_LEN, 1073);
}

#[test]
fn test_read_frame_rejects_unexpected_type() {
    let mut link = MockLink::new();
    link.push(&build_frame(FrameType::Data, &patterned_payload()));

    let mut out = [0u8; PAYLOAD_LEN];
    let err = common::codec().read_frame(&mut link, FrameType::End, &mut out);
    assert_eq!(err, Err(FrameError::Type));
}

#[test]
fn test_read_frame_rejects_tampered_ciphertext() {
    let mut link = MockLink::new();
    link.push(&corrupted(build_frame(FrameType::Data, &patterned_payload())));

    let mut out = [0u8; PAYLOAD_LEN];
    let err = common::codec().read_frame(&mut link, FrameType::Data, &mut out);
    assert_eq!(err, Err(FrameError::Integrity));
}

#[test]
fn test_read_frame_rejects_truncated_stream() {
    let mut frame = build_frame(FrameType::Data, &patterned_payload());
    frame.truncate(FRAME_LEN - 10);
    let mut link = MockLink::new();
    link.push(&frame);

    let mut out = [0u8; PAYLOAD_LEN];
    let err = common::codec().read_frame(&mut link, FrameType::Data, &mut out);
    assert_eq!(err, Err(FrameError::Link));
}

#[test]
fn test_read_frame_rejects_tampered_iv() {
    let payload = patterned_payload();
    let mut frame = build_frame(FrameType::Data, &payload);
    let iv_start = FRAME_LEN - TEST_IV.len();
    frame[iv_start] ^= 0xFF;
    let mut link = MockLink::new();
    link.push(&frame);

    let mut out = [0u8; PAYLOAD_LEN];
    let err = common::codec().read_frame(&mut link, FrameType::Data, &mut out);
    assert_eq!(err, Err(FrameError::Integrity));
}

// =============================================================================
// START payload layout
// =============================================================================

#[test]
fn test_start_info_parse_is_little_endian() {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..6].copy_from_slice(&[0x03, 0x00, 0x00, 0x08, 0x14, 0x00]);

    let info = StartInfo::parse(&payload);
    assert_eq!(info.version, 3);
    assert_eq!(info.firmware_size, 2048);
    assert_eq!(info.message_size, 20);
    assert_eq!(info.total_size(), 2068);
}

#[test]
fn test_start_info_encode_parse_roundtrip() {
    let info = StartInfo {
        version: 0x1234,
        firmware_size: 0xFFFF,
        message_size: 7,
    };
    let mut payload = [0u8; PAYLOAD_LEN];
    info.encode_into(&mut payload);
    assert_eq!(StartInfo::parse(&payload), info);
}

#[test]
fn test_start_info_total_size_does_not_wrap() {
    let info = StartInfo {
        version: 1,
        firmware_size: 0xFFFF,
        message_size: 0xFFFF,
    };
    assert_eq!(info.total_size(), 0x1FFFE);
}

// =============================================================================
// Replies
// =============================================================================

#[test]
fn test_reply_encoding() {
    assert_eq!(ReplyStatus::Ok.encode(), [REPLY_MARKER, 0x00]);
    assert_eq!(ReplyStatus::Error.encode(), [REPLY_MARKER, 0x01]);
    assert_eq!(ReplyStatus::End.encode(), [REPLY_MARKER, 0x02]);
}

#[test]
fn test_reply_decode_roundtrip() {
    for status in [ReplyStatus::Ok, ReplyStatus::Error, ReplyStatus::End] {
        assert_eq!(ReplyStatus::decode(status.encode()), Some(status));
    }
}

#[test]
fn test_reply_decode_rejects_bad_marker_and_status() {
    assert_eq!(ReplyStatus::decode([0x00, 0x00]), None);
    assert_eq!(ReplyStatus::decode([REPLY_MARKER, 0x03]), None);
}
