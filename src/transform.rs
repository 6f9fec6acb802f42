//! # Payload transform.
//!
//! Decoding applied to every raw unit an input module receives, chosen once when
//! the module is built:
//!
//! - **Identity** (no secret configured): `decode(x) = x`.
//! - **Decrypt** (secret configured): `decode(x) = aes256_ecb_decrypt(key, base64(x))`.
//!
//! The key is the secret truncated or right-padded with `0x00` to exactly 32 bytes.
//! This is what mod_gearman based producers use, so it must stay bit-exact:
//!
//! ```text
//! key = secret[0..min(len, 32)] ++ [0x00; 32 - min(len, 32)]
//! ```
//!
//! Producers zero-pad the plaintext to the 16-byte block size; decoding strips
//! trailing `0x00` bytes again.
//!
//! ## Example
//! ```rust
//! use actorvisor::PayloadTransform;
//!
//! let t = PayloadTransform::from_secret(Some("kkkkkkkkkk")).unwrap();
//! let wire = t.encode(b"payload");
//! assert_eq!(t.decode(&wire).unwrap(), b"payload");
//! ```

use std::fmt;

use aes::Aes256;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};
use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use zeroize::Zeroize;

use crate::error::ModuleError;

/// Cipher key length in bytes.
pub const KEY_LEN: usize = 32;

const BLOCK_LEN: usize = 16;

/// Errors raised while decoding one unit.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransformError {
    /// The unit is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded ciphertext is not a whole number of cipher blocks.
    #[error("ciphertext length {0} is not a multiple of {BLOCK_LEN}")]
    BlockLength(usize),
}

/// Derives the 32-byte cipher key from a configured secret.
///
/// ```rust
/// use actorvisor::transform::derive_key;
///
/// let key = derive_key(b"abc");
/// assert_eq!(&key[..3], b"abc");
/// assert!(key[3..].iter().all(|b| *b == 0));
/// ```
pub fn derive_key(secret: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let n = secret.len().min(KEY_LEN);
    key[..n].copy_from_slice(&secret[..n]);
    key
}

/// Decoding applied to raw units.
#[derive(Clone)]
pub enum PayloadTransform {
    /// Pass-through.
    Identity,
    /// Base64 decode, then AES-256-ECB decrypt.
    Decrypt(Aes256),
}

impl PayloadTransform {
    /// Selects the transform for an optional secret.
    ///
    /// An empty secret is a configuration error: it would silently decrypt with
    /// an all-zero key.
    pub fn from_secret(secret: Option<&str>) -> Result<Self, ModuleError> {
        match secret {
            None => Ok(PayloadTransform::Identity),
            Some("") => Err(ModuleError::invalid(
                "secret",
                "must not be empty (derived key would be all zero bytes)",
            )),
            Some(s) => {
                let mut key = derive_key(s.as_bytes());
                let cipher = Aes256::new(GenericArray::from_slice(&key));
                key.zeroize();
                Ok(PayloadTransform::Decrypt(cipher))
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, PayloadTransform::Identity)
    }

    /// Decodes one raw unit.
    ///
    /// In decrypt mode every trailing `0x00` byte is removed after decryption,
    /// whether it was block padding or part of the plaintext. A plaintext that
    /// ends in NUL bytes therefore comes back shorter, and a peer that keeps the
    /// padding will see different bytes for the same unit. Units are expected
    /// to be text.
    pub fn decode(&self, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
        let cipher = match self {
            PayloadTransform::Identity => return Ok(raw.to_vec()),
            PayloadTransform::Decrypt(cipher) => cipher,
        };

        // Producers may wrap base64 lines.
        let text: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let mut buf = STANDARD.decode(text)?;
        if buf.len() % BLOCK_LEN != 0 {
            return Err(TransformError::BlockLength(buf.len()));
        }
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }

        let end = buf.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        buf.truncate(end);
        Ok(buf)
    }

    /// Producer-side inverse of [`decode`](Self::decode).
    ///
    /// Identity returns the input unchanged; decrypt mode zero-pads to the block
    /// size, encrypts and base64-encodes.
    pub fn encode(&self, plain: &[u8]) -> Vec<u8> {
        let cipher = match self {
            PayloadTransform::Identity => return plain.to_vec(),
            PayloadTransform::Decrypt(cipher) => cipher,
        };

        let mut buf = plain.to_vec();
        buf.resize(plain.len().div_ceil(BLOCK_LEN).max(1) * BLOCK_LEN, 0);
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
        STANDARD.encode(buf).into_bytes()
    }
}

impl fmt::Debug for PayloadTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadTransform::Identity => f.write_str("Identity"),
            PayloadTransform::Decrypt(_) => f.write_str("Decrypt(aes-256-ecb)"),
        }
    }
}
