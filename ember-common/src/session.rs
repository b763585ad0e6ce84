// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The update session state machine.
//!
//! One session drives a whole update: a START frame carrying version and
//! sizes, DATA frames carrying the image page by page, and an END frame.
//! Every failed attempt at a frame position is answered with an ERROR reply
//! and charged against a shared error budget; once the budget is exhausted
//! the session replies END and hands an [`UpdateOutcome::Aborted`] to the
//! caller, whose job it is to reset the device.

use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;

use crate::codec::{FrameCodec, FrameError};
use crate::debug_log;
use crate::flash::{program_page, verify_range};
use crate::metadata::Metadata;
use crate::protocol::{
    FrameType, ReplyStatus, StartInfo, FIRMWARE_BASE, FLASH_PAGE_SIZE, PAYLOAD_LEN,
};

/// Errors tolerated at a single logical frame position. One more aborts
/// the session.
pub const MAX_FRAME_ERRORS: u8 = 10;

/// Why one attempt at a frame position failed.
///
/// Every variant produces the same ERROR reply on the wire; the distinction
/// only feeds the debug channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// The frame never made it past the codec.
    Frame(FrameError),
    /// START carried a version below the installed one.
    Rollback,
    /// The flash driver refused an erase or program operation.
    FlashProgram,
    /// The page read back different from what was programmed.
    FlashVerify,
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateOutcome {
    /// Metadata and image committed; the final OK reply has been sent.
    Installed(Metadata),
    /// Error budget exhausted. The END reply has been sent; the caller
    /// must reset the device.
    Aborted,
}

/// Cumulative error count for the current frame position.
///
/// The budget is shared between the receive and program retry scopes of a
/// DATA position, so a clean reception never refunds programming failures.
/// It starts fresh after every successfully committed position.
struct ErrorBudget {
    errors: u8,
}

struct BudgetExhausted;

impl ErrorBudget {
    fn new() -> Self {
        Self { errors: 0 }
    }

    fn charge(&mut self) -> Result<(), BudgetExhausted> {
        self.errors += 1;
        if self.errors > MAX_FRAME_ERRORS {
            Err(BudgetExhausted)
        } else {
            Ok(())
        }
    }

    fn clear(&mut self) {
        self.errors = 0;
    }
}

/// One firmware update: START -> DATA* -> END.
pub struct UpdateSession<'a, L, F> {
    link: &'a mut L,
    flash: &'a mut F,
    codec: FrameCodec,
}

impl<'a, L, F> UpdateSession<'a, L, F>
where
    L: Read + Write,
    F: NorFlash,
{
    pub fn new(link: &'a mut L, flash: &'a mut F, codec: FrameCodec) -> Self {
        Self { link, flash, codec }
    }

    /// Drive the session to completion.
    pub fn run(mut self) -> UpdateOutcome {
        let mut budget = ErrorBudget::new();
        let mut payload = [0u8; PAYLOAD_LEN];

        debug_log!("update started");

        // START: version and sizes, rollback check, metadata commit.
        let (meta, info) = loop {
            match self.start_position(&mut payload) {
                Ok(accepted) => break accepted,
                Err(err) => {
                    debug_log!("start frame rejected: {}", err);
                    self.reply(ReplyStatus::Error);
                    if budget.charge().is_err() {
                        return self.abort();
                    }
                }
            }
        };
        self.reply(ReplyStatus::Ok);
        budget.clear();
        debug_log!(
            "metadata committed: version {}, image {} bytes",
            meta.version,
            meta.firmware_size
        );

        // DATA: one page per frame, in address order.
        let total = info.total_size();
        let mut page_addr = FIRMWARE_BASE;
        let mut offset = 0u32;
        while offset < total {
            // Receive scope: retry until an authenticated DATA frame arrives.
            loop {
                match self
                    .codec
                    .read_frame(&mut *self.link, FrameType::Data, &mut payload)
                {
                    Ok(()) => break,
                    Err(err) => {
                        debug_log!("data frame rejected: {}", err);
                        self.reply(ReplyStatus::Error);
                        if budget.charge().is_err() {
                            return self.abort();
                        }
                    }
                }
            }
            debug_log!("received image bytes at offset 0x{:08x}", offset);

            let n = (total - offset).min(FLASH_PAGE_SIZE) as usize;

            // Program scope: erase+program+readback under the same budget.
            loop {
                match self.commit_page(page_addr, &payload[..n]) {
                    Ok(()) => break,
                    Err(err) => {
                        debug_log!("page commit failed: {}", err);
                        self.reply(ReplyStatus::Error);
                        if budget.charge().is_err() {
                            return self.abort();
                        }
                    }
                }
            }
            debug_log!("page programmed at 0x{:08x} ({} bytes)", page_addr, n);

            page_addr += FLASH_PAGE_SIZE;
            offset += FLASH_PAGE_SIZE;
            self.reply(ReplyStatus::Ok);
            budget.clear();
        }

        // END: authenticated termination marker; the payload is ignored.
        loop {
            match self
                .codec
                .read_frame(&mut *self.link, FrameType::End, &mut payload)
            {
                Ok(()) => break,
                Err(err) => {
                    debug_log!("end frame rejected: {}", err);
                    self.reply(ReplyStatus::Error);
                    if budget.charge().is_err() {
                        return self.abort();
                    }
                }
            }
        }
        self.reply(ReplyStatus::Ok);
        debug_log!("end frame processed");

        UpdateOutcome::Installed(meta)
    }

    /// One attempt at the START position. On success the new metadata
    /// record is already committed, so no image byte can land in flash
    /// without a record describing it.
    fn start_position(
        &mut self,
        payload: &mut [u8; PAYLOAD_LEN],
    ) -> Result<(Metadata, StartInfo), SessionError> {
        self.codec
            .read_frame(&mut *self.link, FrameType::Start, payload)?;
        let info = StartInfo::parse(payload);
        debug_log!(
            "received version {}, image {} bytes, message {} bytes",
            info.version,
            info.firmware_size,
            info.message_size
        );

        let installed = Metadata::read(&mut *self.flash).map_err(|_| SessionError::FlashProgram)?;

        // Version 0 marks a debug build: keep the installed version.
        let version = if info.version == 0 {
            installed.version
        } else {
            info.version
        };
        if version < installed.version {
            debug_log!(
                "rejecting version {} below installed {}",
                version,
                installed.version
            );
            return Err(SessionError::Rollback);
        }

        let meta = Metadata {
            version,
            firmware_size: info.firmware_size,
        };
        meta.write(&mut *self.flash)
            .map_err(|_| SessionError::FlashProgram)?;
        Ok((meta, info))
    }

    /// Erase and program one page, then prove the write by reading it back.
    fn commit_page(&mut self, page_addr: u32, data: &[u8]) -> Result<(), SessionError> {
        program_page(&mut *self.flash, page_addr, data).map_err(|_| SessionError::FlashProgram)?;
        match verify_range(&mut *self.flash, page_addr, data) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(SessionError::FlashVerify),
        }
    }

    /// Replies are fire-and-forget; a dead host link surfaces as read
    /// failures on the next frame.
    fn reply(&mut self, status: ReplyStatus) {
        self.link.write_all(&status.encode()).ok();
    }

    fn abort(&mut self) -> UpdateOutcome {
        debug_log!("too many errors, giving up");
        self.reply(ReplyStatus::End);
        UpdateOutcome::Aborted
    }
}
