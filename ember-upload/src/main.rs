// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware sealing and upload tool for ember-bootloader.
//!
//! Usage:
//!   ember-upload --port /dev/ttyUSB0 update firmware.bin --version 3 --message "release build 2.4.1"
//!   ember-upload seal firmware.bin firmware.sealed --version 3 --message "release build 2.4.1"
//!   ember-upload --port /dev/ttyUSB0 boot

mod cli;
mod commands;
mod seal;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
