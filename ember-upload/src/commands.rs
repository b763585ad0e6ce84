// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use ember_common::protocol::{ReplyStatus, CMD_BOOT, CMD_UPDATE};
use ember_common::MAX_FRAME_ERRORS;

use crate::seal::seal_image;
use crate::transport::Transport;

/// Retransmissions per frame before giving up, mirroring the device's
/// error budget.
const MAX_RETRANSMITS: u32 = MAX_FRAME_ERRORS as u32;

/// Seal a firmware image and drive a full update.
pub fn update(transport: &mut Transport, file: &Path, version: u16, message: &str) -> Result<()> {
    let firmware =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let frames = seal_image(&firmware, version, message)?;

    println!("Firmware: {} ({} bytes)", file.display(), firmware.len());
    println!("Version:  {}", version);
    println!("Frames:   {} (START + DATA + END)", frames.len());
    println!();

    transport.command(CMD_UPDATE)?;

    let pb = ProgressBar::new(frames.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})",
            )?
            .progress_chars("#>-"),
    );

    for (index, frame) in frames.iter().enumerate() {
        if let Err(err) = send_with_retry(transport, frame, index) {
            pb.abandon();
            return Err(err);
        }
        pb.inc(1);
    }

    pb.finish_with_message("Update complete");
    println!();
    println!("Firmware installed successfully!");
    println!(
        "Use 'ember-upload --port {} boot' to run it.",
        transport.port_name()
    );

    Ok(())
}

/// Send one frame, retransmitting on ERROR replies.
fn send_with_retry(transport: &mut Transport, frame: &[u8], index: usize) -> Result<()> {
    let mut attempts = 0u32;
    loop {
        match transport.send_frame(frame)? {
            ReplyStatus::Ok => return Ok(()),
            ReplyStatus::Error => {
                attempts += 1;
                if attempts > MAX_RETRANSMITS {
                    bail!("Frame {} rejected {} times", index, attempts);
                }
            }
            ReplyStatus::End => {
                bail!("Device gave up during frame {} and is resetting", index)
            }
        }
    }
}

/// Seal a firmware image into a frame-stream file without sending it.
pub fn seal_to_file(file: &Path, out: &Path, version: u16, message: &str) -> Result<()> {
    let firmware =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let frames = seal_image(&firmware, version, message)?;

    let stream: Vec<u8> = frames.concat();
    fs::write(out, &stream).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Sealed {} ({} bytes) into {} ({} frames, {} bytes)",
        file.display(),
        firmware.len(),
        out.display(),
        frames.len(),
        stream.len()
    );
    Ok(())
}

/// Boot the installed firmware.
pub fn boot(transport: &mut Transport) -> Result<()> {
    transport.command(CMD_BOOT)?;
    println!("Boot command accepted; device is starting its firmware.");
    println!("The release message is printed on the device's debug channel.");
    Ok(())
}
