// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Page-granular flash programming over the `embedded-storage` NorFlash
//! contract.
//!
//! The firmware region erases and programs in whole 1024-byte pages and the
//! underlying driver programs 4-byte words, so a partial page ends in one
//! packed tail word: remaining bytes in the low positions, 0xFF above them.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use heapless::Vec;

use crate::protocol::{FLASH_PAGE_SIZE, FLASH_WRITE_SIZE};

/// Upper bound on the release-message scan at boot.
pub const RELEASE_MESSAGE_CAP: usize = 1024;

/// Erase the page at `page_addr` and program `data` into its head.
///
/// `page_addr` must be page-aligned and `data` at most one page. Bytes past
/// `data.len()` are left in the erased state.
pub fn program_page<F: NorFlash>(flash: &mut F, page_addr: u32, data: &[u8]) -> Result<(), F::Error> {
    debug_assert!(page_addr % FLASH_PAGE_SIZE == 0);
    debug_assert!(data.len() <= FLASH_PAGE_SIZE as usize);

    flash.erase(page_addr, page_addr + FLASH_PAGE_SIZE)?;

    let full = data.len() - data.len() % FLASH_WRITE_SIZE;
    if full > 0 {
        flash.write(page_addr, &data[..full])?;
    }
    if full < data.len() {
        let mut word = [0xFFu8; FLASH_WRITE_SIZE];
        word[..data.len() - full].copy_from_slice(&data[full..]);
        flash.write(page_addr + full as u32, &word)?;
    }
    Ok(())
}

/// Read back `expected.len()` bytes at `addr` and compare them against
/// `expected`, chunk by chunk.
pub fn verify_range<F: ReadNorFlash>(
    flash: &mut F,
    addr: u32,
    expected: &[u8],
) -> Result<bool, F::Error> {
    let mut chunk = [0u8; 64];
    let mut offset = 0usize;
    while offset < expected.len() {
        let n = (expected.len() - offset).min(chunk.len());
        flash.read(addr + offset as u32, &mut chunk[..n])?;
        if chunk[..n] != expected[offset..offset + n] {
            return Ok(false);
        }
        offset += n;
    }
    Ok(true)
}

/// Collect the NUL-terminated release message stored at `addr`.
///
/// The terminator is not included. The scan gives up after
/// [`RELEASE_MESSAGE_CAP`] bytes, so a missing terminator cannot run away
/// across the flash.
pub fn read_release_message<F: ReadNorFlash>(
    flash: &mut F,
    addr: u32,
) -> Result<Vec<u8, RELEASE_MESSAGE_CAP>, F::Error> {
    let mut message = Vec::new();
    let mut chunk = [0u8; 64];
    let mut offset = 0u32;
    'scan: while message.len() < RELEASE_MESSAGE_CAP {
        flash.read(addr + offset, &mut chunk)?;
        for &byte in &chunk {
            if byte == 0 || message.push(byte).is_err() {
                break 'scan;
            }
        }
        offset += chunk.len() as u32;
    }
    Ok(message)
}
