// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode: wire the host link and the flash driver into the session
//! engine.

use ember_common::keys::UPDATE_KEY;
use ember_common::{FrameCodec, UpdateOutcome, UpdateSession};

use crate::flash::XipFlash;
use crate::peripherals::HostUart;

/// Run one update session over the host link.
///
/// An aborted session has already told the host (END reply); all that is
/// left is the hardware reset, so this returns only on success.
pub fn run(host: &mut HostUart, storage: &mut XipFlash) {
    let session = UpdateSession::new(host, storage, FrameCodec::new(UPDATE_KEY));
    match session.run() {
        UpdateOutcome::Installed(meta) => {
            defmt::println!(
                "installed firmware version {} ({} bytes)",
                meta.version,
                meta.firmware_size
            );
        }
        UpdateOutcome::Aborted => {
            defmt::println!("update aborted, resetting");
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}
