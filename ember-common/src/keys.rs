// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Pre-shared update key.
//!
//! The same secret is baked into the bootloader and the trusted host tool;
//! provisioning replaces it per fleet at build time. As a `const` it ends
//! up in flash-resident rodata on the device, never in initialized RAM.

use crate::protocol::KEY_LEN;

/// AES-128 key sealing and opening update frames.
pub const UPDATE_KEY: [u8; KEY_LEN] = [
    0x9f, 0x10, 0x43, 0x76, 0x62, 0x64, 0xd1, 0xdf, //
    0x40, 0x7a, 0xed, 0xa4, 0x09, 0xe4, 0xb1, 0xa0,
];
