// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared test doubles: a RAM-backed NorFlash with fault injection and a
//! scripted host link, plus host-side frame builders.

#![allow(dead_code)]

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};

use ember_common::keys::UPDATE_KEY;
use ember_common::protocol::{FRAME_LEN, IV_LEN, PAYLOAD_LEN};
use ember_common::{FrameCodec, FrameType, StartInfo};

// =============================================================================
// MockFlash
// =============================================================================

/// Covers the metadata page and the firmware region.
pub const FLASH_CAPACITY: usize = 0x4_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashOp {
    Erase { from: u32, to: u32 },
    Write { offset: u32, len: usize },
}

/// RAM-backed flash in factory (all-ones) state.
///
/// `failing_writes` rejects the next N program operations at the driver
/// level; `corrupt_writes` lets the next N program operations land with
/// their first byte flipped, which only the readback compare can catch.
/// Both injections apply only to writes at or above `fault_from`, so a
/// test can fault the firmware region without touching the metadata page.
pub struct MockFlash {
    pub mem: Vec<u8>,
    pub ops: Vec<FlashOp>,
    pub failing_writes: usize,
    pub corrupt_writes: usize,
    pub fault_from: u32,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            mem: vec![0xFF; FLASH_CAPACITY],
            ops: Vec::new(),
            failing_writes: 0,
            corrupt_writes: 0,
            fault_from: 0,
        }
    }

    /// Poke an installed-image record directly, bypassing the driver.
    pub fn install_metadata(&mut self, version: u16, firmware_size: u16) {
        let word = (firmware_size as u32) << 16 | version as u32;
        let base = ember_common::protocol::METADATA_BASE as usize;
        self.mem[base..base + 4].copy_from_slice(&word.to_le_bytes());
    }

    pub fn metadata_word(&self) -> u32 {
        let base = ember_common::protocol::METADATA_BASE as usize;
        u32::from_le_bytes(self.mem[base..base + 4].try_into().unwrap())
    }

    pub fn slice(&self, addr: u32, len: usize) -> &[u8] {
        &self.mem[addr as usize..addr as usize + len]
    }
}

impl ErrorType for MockFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for MockFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        bytes.copy_from_slice(&self.mem[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.mem.len()
    }
}

impl NorFlash for MockFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 1024;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from % Self::ERASE_SIZE as u32 != 0 || to % Self::ERASE_SIZE as u32 != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if from > to || to as usize > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        self.ops.push(FlashOp::Erase { from, to });
        self.mem[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset % Self::WRITE_SIZE as u32 != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.mem.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        let faulted = offset >= self.fault_from;
        if faulted && self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(NorFlashErrorKind::Other);
        }
        self.ops.push(FlashOp::Write {
            offset,
            len: bytes.len(),
        });
        self.mem[start..end].copy_from_slice(bytes);
        if faulted && self.corrupt_writes > 0 {
            self.corrupt_writes -= 1;
            self.mem[start] ^= 0xFF;
        }
        Ok(())
    }
}

// =============================================================================
// MockLink
// =============================================================================

/// Scripted half-duplex host link: the test queues host->device bytes up
/// front and collects every device->host reply.
pub struct MockLink {
    rx: Vec<u8>,
    pos: usize,
    pub tx: Vec<u8>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            rx: Vec::new(),
            pos: 0,
            tx: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend_from_slice(bytes);
    }

    /// The reply stream chunked into 2-byte replies.
    pub fn replies(&self) -> Vec<[u8; 2]> {
        self.tx.chunks(2).map(|c| [c[0], c[1]]).collect()
    }
}

impl embedded_io::ErrorType for MockLink {
    type Error = core::convert::Infallible;
}

impl embedded_io::Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len() - self.pos);
        buf[..n].copy_from_slice(&self.rx[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl embedded_io::Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// =============================================================================
// Frame builders (the host side of the protocol)
// =============================================================================

pub const TEST_IV: [u8; IV_LEN] = [0x42; IV_LEN];

pub fn codec() -> FrameCodec {
    FrameCodec::new(UPDATE_KEY)
}

pub fn build_frame(ty: FrameType, payload: &[u8; PAYLOAD_LEN]) -> Vec<u8> {
    let sealed = codec().seal(&TEST_IV, payload);
    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.push(ty.tag());
    frame.extend_from_slice(&sealed);
    frame.extend_from_slice(&TEST_IV);
    frame
}

pub fn start_frame(version: u16, firmware_size: u16, message_size: u16) -> Vec<u8> {
    let mut payload = [0u8; PAYLOAD_LEN];
    StartInfo {
        version,
        firmware_size,
        message_size,
    }
    .encode_into(&mut payload);
    build_frame(FrameType::Start, &payload)
}

/// DATA payloads are always a full page; the tail past `chunk` is padding
/// the receiver never commits.
pub fn data_frame(chunk: &[u8]) -> Vec<u8> {
    let mut payload = [0xFFu8; PAYLOAD_LEN];
    payload[..chunk.len()].copy_from_slice(chunk);
    build_frame(FrameType::Data, &payload)
}

pub fn end_frame() -> Vec<u8> {
    build_frame(FrameType::End, &[0u8; PAYLOAD_LEN])
}

/// Flip one ciphertext byte so the frame fails its digest check.
pub fn corrupted(mut frame: Vec<u8>) -> Vec<u8> {
    frame[1 + 200] ^= 0x01;
    frame
}
