// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

use ember_common::protocol::ReplyStatus;

/// Default timeout for serial operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// UART transport for communicating with the bootloader.
pub struct Transport {
    port: Box<dyn SerialPort>,
}

impl Transport {
    /// Create a new transport connection to the specified serial port.
    pub fn new(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, 115_200)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self { port })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Send a command byte and wait for the bootloader to echo it.
    pub fn command(&mut self, cmd: u8) -> Result<()> {
        self.port.write_all(&[cmd])?;
        self.port.flush()?;

        let mut echo = [0u8; 1];
        self.port
            .read_exact(&mut echo)
            .context("Timeout waiting for command echo")?;
        if echo[0] != cmd {
            bail!("Unexpected command echo: {:#04x}", echo[0]);
        }
        Ok(())
    }

    /// Send one frame and wait for its 2-byte reply.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<ReplyStatus> {
        self.port.write_all(frame)?;
        self.port.flush()?;
        self.read_reply()
    }

    /// Read one reply off the wire.
    pub fn read_reply(&mut self) -> Result<ReplyStatus> {
        let mut raw = [0u8; 2];
        self.port
            .read_exact(&mut raw)
            .context("Timeout waiting for reply")?;
        ReplyStatus::decode(raw)
            .ok_or_else(|| anyhow::anyhow!("Malformed reply: {:02x?}", raw))
    }
}
