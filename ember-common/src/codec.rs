// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Frame codec: read, decrypt and authenticate one wire frame.
//!
//! A frame is `type tag | AES-128-CBC(payload | SHA-256(payload)) | IV`.
//! Decryption happens in place in a single buffer; the digest comparison is
//! constant time. The [`seal`](FrameCodec::seal) direction exists for the
//! trusted host tool and for tests.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use embedded_io::Read;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::protocol::{FrameType, IV_LEN, KEY_LEN, PAYLOAD_LEN, SEALED_LEN};

type CbcDecryptor = cbc::Decryptor<aes::Aes128>;
type CbcEncryptor = cbc::Encryptor<aes::Aes128>;

/// Why a frame was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Type tag does not match what the session expects.
    Type,
    /// Digest over the decrypted payload does not match the trailing digest.
    Integrity,
    /// The host link failed mid-frame.
    Link,
}

/// Holds the pre-shared key and performs per-frame crypto.
pub struct FrameCodec {
    key: [u8; KEY_LEN],
}

impl FrameCodec {
    pub const fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Blocking-read one frame from the link and open it.
    ///
    /// The authenticated payload is copied into `out` on success. A tag
    /// mismatch returns immediately without consuming the rest of the
    /// frame; the retry policy upstream deals with the desynchronized
    /// stream by exhausting its error budget.
    pub fn read_frame<L: Read>(
        &self,
        link: &mut L,
        expected: FrameType,
        out: &mut [u8; PAYLOAD_LEN],
    ) -> Result<(), FrameError> {
        let mut tag = [0u8; 1];
        link.read_exact(&mut tag).map_err(|_| FrameError::Link)?;
        if tag[0] != expected.tag() {
            return Err(FrameError::Type);
        }

        let mut sealed = [0u8; SEALED_LEN];
        link.read_exact(&mut sealed).map_err(|_| FrameError::Link)?;
        let mut iv = [0u8; IV_LEN];
        link.read_exact(&mut iv).map_err(|_| FrameError::Link)?;

        self.open(&iv, &mut sealed)?;
        out.copy_from_slice(&sealed[..PAYLOAD_LEN]);
        Ok(())
    }

    /// Decrypt a sealed buffer in place and check its trailing digest.
    pub fn open(&self, iv: &[u8; IV_LEN], sealed: &mut [u8; SEALED_LEN]) -> Result<(), FrameError> {
        CbcDecryptor::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(iv),
        )
        .decrypt_padded_mut::<NoPadding>(sealed)
        .map_err(|_| FrameError::Integrity)?;

        let digest = Sha256::digest(&sealed[..PAYLOAD_LEN]);
        if bool::from(digest.as_slice().ct_eq(&sealed[PAYLOAD_LEN..])) {
            Ok(())
        } else {
            Err(FrameError::Integrity)
        }
    }

    /// Digest and encrypt a payload: the host-side inverse of
    /// [`open`](Self::open).
    pub fn seal(&self, iv: &[u8; IV_LEN], payload: &[u8; PAYLOAD_LEN]) -> [u8; SEALED_LEN] {
        let mut sealed = [0u8; SEALED_LEN];
        sealed[..PAYLOAD_LEN].copy_from_slice(payload);
        let digest = Sha256::digest(payload);
        sealed[PAYLOAD_LEN..].copy_from_slice(&digest);

        CbcEncryptor::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(iv),
        )
        .encrypt_padded_mut::<NoPadding>(&mut sealed, SEALED_LEN)
        .expect("sealed section is a whole number of cipher blocks");
        sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [0xA5; KEY_LEN];
    const IV: [u8; IV_LEN] = [0x3C; IV_LEN];

    fn payload() -> [u8; PAYLOAD_LEN] {
        let mut p = [0u8; PAYLOAD_LEN];
        for (i, b) in p.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        p
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let codec = FrameCodec::new(KEY);
        let mut sealed = codec.seal(&IV, &payload());
        codec.open(&IV, &mut sealed).unwrap();
        assert_eq!(&sealed[..PAYLOAD_LEN], &payload()[..]);
    }

    #[test]
    fn test_sealed_bytes_do_not_leak_plaintext() {
        let codec = FrameCodec::new(KEY);
        let sealed = codec.seal(&IV, &payload());
        assert_ne!(&sealed[..PAYLOAD_LEN], &payload()[..]);
    }

    #[test]
    fn test_open_rejects_tampered_ciphertext() {
        let codec = FrameCodec::new(KEY);
        let mut sealed = codec.seal(&IV, &payload());
        sealed[100] ^= 0x01;
        assert_eq!(codec.open(&IV, &mut sealed), Err(FrameError::Integrity));
    }

    #[test]
    fn test_open_rejects_tampered_digest() {
        let codec = FrameCodec::new(KEY);
        let mut sealed = codec.seal(&IV, &payload());
        sealed[SEALED_LEN - 1] ^= 0x80;
        assert_eq!(codec.open(&IV, &mut sealed), Err(FrameError::Integrity));
    }

    #[test]
    fn test_open_rejects_wrong_key() {
        let codec = FrameCodec::new(KEY);
        let mut sealed = codec.seal(&IV, &payload());
        let other = FrameCodec::new([0x5A; KEY_LEN]);
        assert_eq!(other.open(&IV, &mut sealed), Err(FrameError::Integrity));
    }

    #[test]
    fn test_open_rejects_wrong_iv() {
        let codec = FrameCodec::new(KEY);
        let mut sealed = codec.seal(&IV, &payload());
        assert_eq!(
            codec.open(&[0u8; IV_LEN], &mut sealed),
            Err(FrameError::Integrity)
        );
    }
}
