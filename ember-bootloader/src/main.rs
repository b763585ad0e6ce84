// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Ember Bootloader for RP2040: authenticated firmware updates over UART.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod update;

use defmt_rtt as _;
use panic_probe as _;

use embedded_io::{Read, Write};

use ember_common::protocol::{CMD_BOOT, CMD_UPDATE};

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();
    flash::init();
    let mut storage = flash::XipFlash;

    defmt::println!("Welcome to the firmware update service");
    defmt::println!("Send 'U' to update, 'B' to run the installed firmware");
    defmt::println!("0x20 on the reset link restarts the device");

    // Command loop: one byte per command, echoed back once accepted.
    loop {
        let mut cmd = [0u8; 1];
        if p.host.read_exact(&mut cmd).is_err() {
            continue;
        }
        match cmd[0] {
            CMD_UPDATE => {
                p.host.write_all(&[CMD_UPDATE]).ok();
                update::run(&mut p.host, &mut storage);
                defmt::println!("Loaded new firmware");
            }
            CMD_BOOT => {
                p.host.write_all(&[CMD_BOOT]).ok();
                boot::run(&mut p, &mut storage);
            }
            _ => {}
        }
    }
}
