// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Persisted record of the installed image.
//!
//! One 32-bit little-endian word in its own flash page: low half the
//! firmware version, high half the firmware size in bytes. The word fits a
//! single program operation, so readers see either the old record or the
//! new one, never a torn value.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::flash::program_page;
use crate::protocol::METADATA_BASE;

/// Installed version and firmware size.
///
/// A factory-fresh device has an erased (all-ones) metadata word, which
/// reads back as version 0xFFFF / size 0xFFFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Metadata {
    pub version: u16,
    pub firmware_size: u16,
}

impl Metadata {
    pub fn from_word(word: u32) -> Self {
        Self {
            version: word as u16,
            firmware_size: (word >> 16) as u16,
        }
    }

    pub fn to_word(self) -> u32 {
        (self.firmware_size as u32) << 16 | self.version as u32
    }

    pub fn read<F: ReadNorFlash>(flash: &mut F) -> Result<Self, F::Error> {
        let mut word = [0u8; 4];
        flash.read(METADATA_BASE, &mut word)?;
        Ok(Self::from_word(u32::from_le_bytes(word)))
    }

    /// Persist the record: erase the metadata page, program the word.
    ///
    /// Must happen before any byte of the image it describes is programmed.
    pub fn write<F: NorFlash>(self, flash: &mut F) -> Result<(), F::Error> {
        program_page(flash, METADATA_BASE, &self.to_word().to_le_bytes())
    }
}
