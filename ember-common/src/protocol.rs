// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared protocol definitions for bootloader <-> host communication.
//!
//! Everything on the wire is fixed-layout binary: a 1073-byte update frame
//! from the host, a 2-byte reply from the bootloader. This module pins down
//! the frame geometry, the command bytes, and the flash layout both sides
//! agree on.

// --- Frame geometry ---

/// Plaintext payload carried by every frame, regardless of type.
pub const PAYLOAD_LEN: usize = 1024;
/// SHA-256 digest appended to the payload before encryption.
pub const DIGEST_LEN: usize = 32;
/// Ciphertext section of a frame: payload and digest, encrypted together.
pub const SEALED_LEN: usize = PAYLOAD_LEN + DIGEST_LEN;
/// CBC initialization vector trailing the ciphertext.
pub const IV_LEN: usize = 16;
/// Pre-shared AES-128 key.
pub const KEY_LEN: usize = 16;
/// One frame on the wire: type tag, ciphertext, IV.
pub const FRAME_LEN: usize = 1 + SEALED_LEN + IV_LEN;

// The sealed section must be an exact multiple of the cipher block.
const _: () = assert!(SEALED_LEN % 16 == 0);
const _: () = assert!(FRAME_LEN == 1073);

/// Frame type tag, first byte on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    /// Carries version, firmware size and release message size.
    Start = 1,
    /// Carries one page worth of image bytes.
    Data = 2,
    /// Authenticated end-of-stream marker.
    End = 3,
}

impl FrameType {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

// --- Replies ---

/// Marker byte leading every 2-byte reply.
pub const REPLY_MARKER: u8 = 0x04;

/// Second byte of a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReplyStatus {
    /// Frame accepted and committed.
    Ok = 0x00,
    /// Frame rejected; the host should retransmit it.
    Error = 0x01,
    /// Session over: sent after the final abort, just before the reset.
    End = 0x02,
}

impl ReplyStatus {
    pub fn encode(self) -> [u8; 2] {
        [REPLY_MARKER, self as u8]
    }

    /// Host-side decoding of a raw reply.
    pub fn decode(raw: [u8; 2]) -> Option<Self> {
        if raw[0] != REPLY_MARKER {
            return None;
        }
        match raw[1] {
            0x00 => Some(Self::Ok),
            0x01 => Some(Self::Error),
            0x02 => Some(Self::End),
            _ => None,
        }
    }
}

// --- Commands ---

/// Host-link command: start an update session.
pub const CMD_UPDATE: u8 = b'U';
/// Host-link command: boot the installed firmware.
pub const CMD_BOOT: u8 = b'B';
/// Reset-link byte that forces a hardware reset from interrupt context.
pub const RESET_BYTE: u8 = 0x20;

// --- Flash layout ---

/// Erase/program granularity of the firmware flash region.
pub const FLASH_PAGE_SIZE: u32 = 1024;
/// Smallest programmable unit.
pub const FLASH_WRITE_SIZE: usize = 4;
/// Page holding the metadata word.
pub const METADATA_BASE: u32 = 0xFC00;
/// First byte of the installed image; the release message follows it.
pub const FIRMWARE_BASE: u32 = 0x1_0000;

const _: () = assert!(METADATA_BASE % FLASH_PAGE_SIZE == 0);
const _: () = assert!(FIRMWARE_BASE % FLASH_PAGE_SIZE == 0);
const _: () = assert!(FLASH_PAGE_SIZE as usize == PAYLOAD_LEN);

// --- START payload ---

/// The first six bytes of a START payload, three little-endian u16 fields.
///
/// `version == 0` marks a debug build; the session keeps the installed
/// version in that case. `message_size` counts the release message
/// including its NUL terminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartInfo {
    pub version: u16,
    pub firmware_size: u16,
    pub message_size: u16,
}

impl StartInfo {
    pub fn parse(payload: &[u8; PAYLOAD_LEN]) -> Self {
        Self {
            version: u16::from_le_bytes([payload[0], payload[1]]),
            firmware_size: u16::from_le_bytes([payload[2], payload[3]]),
            message_size: u16::from_le_bytes([payload[4], payload[5]]),
        }
    }

    /// Host-side inverse of [`parse`](Self::parse); the rest of the payload
    /// is left untouched.
    pub fn encode_into(&self, payload: &mut [u8; PAYLOAD_LEN]) {
        payload[0..2].copy_from_slice(&self.version.to_le_bytes());
        payload[2..4].copy_from_slice(&self.firmware_size.to_le_bytes());
        payload[4..6].copy_from_slice(&self.message_size.to_le_bytes());
    }

    /// Bytes that will be flashed: firmware image plus release message.
    pub fn total_size(&self) -> u32 {
        self.firmware_size as u32 + self.message_size as u32
    }
}
