// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Seal a firmware image into the encrypted frame stream the bootloader
//! consumes: START, one DATA frame per flash page, END. Every frame gets a
//! fresh random IV; the release message travels NUL-terminated right after
//! the firmware bytes.

use anyhow::{bail, Result};

use ember_common::keys::UPDATE_KEY;
use ember_common::protocol::{FRAME_LEN, IV_LEN, PAYLOAD_LEN};
use ember_common::{FrameCodec, FrameType, StartInfo};

/// Build the full frame stream for one update.
pub fn seal_image(firmware: &[u8], version: u16, message: &str) -> Result<Vec<Vec<u8>>> {
    if firmware.len() > u16::MAX as usize {
        bail!(
            "firmware too large: {} bytes (max {})",
            firmware.len(),
            u16::MAX
        );
    }
    if message.as_bytes().contains(&0) {
        bail!("release message must not contain NUL");
    }
    // The terminator travels with the message.
    let message_size = message.len() + 1;
    if message_size > u16::MAX as usize {
        bail!("release message too large: {} bytes", message.len());
    }

    let codec = FrameCodec::new(UPDATE_KEY);
    let mut frames = Vec::new();

    let mut payload = [0u8; PAYLOAD_LEN];
    StartInfo {
        version,
        firmware_size: firmware.len() as u16,
        message_size: message_size as u16,
    }
    .encode_into(&mut payload);
    frames.push(build_frame(&codec, FrameType::Start, &payload));

    let mut stream = firmware.to_vec();
    stream.extend_from_slice(message.as_bytes());
    stream.push(0);

    for chunk in stream.chunks(PAYLOAD_LEN) {
        // Padding past the image is never committed by the receiver.
        let mut payload = [0xFFu8; PAYLOAD_LEN];
        payload[..chunk.len()].copy_from_slice(chunk);
        frames.push(build_frame(&codec, FrameType::Data, &payload));
    }

    frames.push(build_frame(&codec, FrameType::End, &[0u8; PAYLOAD_LEN]));
    Ok(frames)
}

fn build_frame(codec: &FrameCodec, ty: FrameType, payload: &[u8; PAYLOAD_LEN]) -> Vec<u8> {
    let iv: [u8; IV_LEN] = rand::random();
    let sealed = codec.seal(&iv, payload);

    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.push(ty.tag());
    frame.extend_from_slice(&sealed);
    frame.extend_from_slice(&iv);
    frame
}
