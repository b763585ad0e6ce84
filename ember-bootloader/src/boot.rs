// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot dispatcher: print the release message, then hand control to the
//! installed firmware.

use embedded_hal::delay::DelayNs;

use ember_common::flash::read_release_message;
use ember_common::protocol::FIRMWARE_BASE;
use ember_common::Metadata;

use crate::flash::{xip_addr, XipFlash};
use crate::peripherals::Peripherals;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }
}

/// Emit the release message stored behind the image, then jump through the
/// image's vector table. Never returns.
pub fn run(p: &mut Peripherals, storage: &mut XipFlash) -> ! {
    let meta = Metadata::read(storage).unwrap_or(Metadata::from_word(u32::MAX));

    let message_addr = FIRMWARE_BASE + meta.firmware_size as u32;
    if let Ok(message) = read_release_message(storage, message_addr) {
        if let Ok(text) = core::str::from_utf8(&message) {
            defmt::println!("{=str}", text);
        }
    }

    defmt::println!("Jumping to firmware...");
    p.timer.delay_ms(10u32);

    unsafe { jump_to_firmware(xip_addr(FIRMWARE_BASE)) }
}

/// # Safety
/// `vt_addr` must point at a valid ARM vector table in executable memory.
unsafe fn jump_to_firmware(vt_addr: u32) -> ! {
    cortex_m::interrupt::disable();

    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(vt_addr);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let vt = VectorTable::read_from(vt_addr);
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // Re-enable interrupts before jumping (firmware expects PRIMASK=0)
        "bx {reset}",
        sp = in(reg) vt.initial_sp,
        reset = in(reg) vt.reset_vector,
        options(noreturn)
    );
}
