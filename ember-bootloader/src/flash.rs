// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash driver: RP2040 ROM routines behind the 1024-byte-page NorFlash
//! contract the update engine programs against.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place critical functions in RAM,
//! and pre-resolve all ROM function pointers at init time.
//!
//! The QSPI part erases in 4096-byte sectors, so the 1024-byte logical page
//! erase of the update engine is a read-modify-write of the containing
//! sector. Programming runs in 256-byte chunks and requires the target
//! range to be in the erased state, which the page programmer guarantees.

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use ember_common::protocol::{FLASH_PAGE_SIZE, FLASH_WRITE_SIZE};

/// Start of memory-mapped (XIP) flash; driver offsets are relative to it.
pub const FLASH_XIP_BASE: u32 = 0x1000_0000;
/// 2 MiB QSPI part.
const FLASH_CAPACITY: u32 = 0x20_0000;
/// Physical erase granularity of the QSPI part.
const SECTOR_SIZE: u32 = 4096;
/// Physical program granularity of the QSPI part.
const PROG_CHUNK: usize = 256;

/// Absolute bus address of a flash offset.
pub fn xip_addr(offset: u32) -> u32 {
    FLASH_XIP_BASE + offset
}

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Initialize ROM flash function pointers. Must be called once before any flash operations.
/// This performs ROM table lookups which require XIP to be active.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Erase whole physical sectors at the given flash-relative offset.
/// Runs entirely from RAM with proper XIP teardown/setup.
///
/// # Safety
/// The `init()` function must have been called first.
#[link_section = ".data"]
#[inline(never)]
unsafe fn sector_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, SECTOR_SIZE, 0x20);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Program 256-byte-aligned chunks at the given flash-relative offset.
/// Runs entirely from RAM with proper XIP teardown/setup.
///
/// # Safety
/// The `init()` function must have been called first.
#[link_section = ".data"]
#[inline(never)]
unsafe fn chunk_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Read bytes at a flash offset through XIP via volatile reads.
fn flash_read(offset: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { (xip_addr(offset + i as u32) as *const u8).read_volatile() };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashError {
    OutOfBounds,
    NotAligned,
    /// Write target was not in the erased state.
    NotErased,
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            FlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            FlashError::NotAligned => NorFlashErrorKind::NotAligned,
            FlashError::NotErased => NorFlashErrorKind::Other,
        }
    }
}

/// The on-chip flash as the update engine sees it: 1024-byte erase pages,
/// 4-byte program words, byte-granular reads.
pub struct XipFlash;

impl ErrorType for XipFlash {
    type Error = FlashError;
}

impl ReadNorFlash for XipFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if offset as usize + bytes.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::OutOfBounds);
        }
        flash_read(offset, bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_CAPACITY as usize
    }
}

impl NorFlash for XipFlash {
    const WRITE_SIZE: usize = FLASH_WRITE_SIZE;
    const ERASE_SIZE: usize = FLASH_PAGE_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from % FLASH_PAGE_SIZE != 0 || to % FLASH_PAGE_SIZE != 0 {
            return Err(FlashError::NotAligned);
        }
        if from > to || to > FLASH_CAPACITY {
            return Err(FlashError::OutOfBounds);
        }
        let mut page = from;
        while page < to {
            erase_logical_page(page);
            page += FLASH_PAGE_SIZE;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset % Self::WRITE_SIZE as u32 != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(FlashError::NotAligned);
        }
        let end = offset + bytes.len() as u32;
        if end > FLASH_CAPACITY {
            return Err(FlashError::OutOfBounds);
        }

        // NOR programming only clears bits; refuse a target that still
        // holds data so the engine's erase-then-program discipline shows
        // up as a driver error instead of silent corruption.
        let mut chunk = [0u8; PROG_CHUNK];
        let mut pos = offset;
        while pos < end {
            let n = ((end - pos) as usize).min(PROG_CHUNK);
            flash_read(pos, &mut chunk[..n]);
            if chunk[..n].iter().any(|&b| b != 0xFF) {
                return Err(FlashError::NotErased);
            }
            pos += n as u32;
        }

        // Program chunk by chunk; the untouched head and tail of each
        // 256-byte chunk reprogram their existing bits, which clears
        // nothing.
        let mut chunk_base = offset & !(PROG_CHUNK as u32 - 1);
        while chunk_base < end {
            flash_read(chunk_base, &mut chunk);
            let copy_from = offset.max(chunk_base);
            let copy_to = end.min(chunk_base + PROG_CHUNK as u32);
            let src = &bytes[(copy_from - offset) as usize..(copy_to - offset) as usize];
            chunk[(copy_from - chunk_base) as usize..(copy_to - chunk_base) as usize]
                .copy_from_slice(src);
            unsafe {
                chunk_program(chunk_base, chunk.as_ptr(), PROG_CHUNK);
            }
            chunk_base += PROG_CHUNK as u32;
        }
        Ok(())
    }
}

/// Logical 1024-byte page erase by read-modify-write of the containing
/// 4096-byte sector.
fn erase_logical_page(page_addr: u32) {
    let sector = page_addr & !(SECTOR_SIZE - 1);
    let mut buf = [0u8; SECTOR_SIZE as usize];
    flash_read(sector, &mut buf);

    let start = (page_addr - sector) as usize;
    buf[start..start + FLASH_PAGE_SIZE as usize].fill(0xFF);

    unsafe {
        sector_erase(sector, SECTOR_SIZE);
        chunk_program(sector, buf.as_ptr(), SECTOR_SIZE as usize);
    }
}
