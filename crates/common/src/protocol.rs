//! Container constants, engine selectors, key material, and the report format.
//!
//! # Encrypted container layout
//!
//! ```text
//! [0x00] IV          (16 bytes)
//! [0x10] Ciphertext  (N bytes, N = align16(plaintext length))
//! ```
//!
//! The whole file is `16 + N` bytes. Ciphertext decodes to the plaintext
//! followed by zero padding up to the block boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Engine block size; every transformed length is a multiple of this.
pub const BLOCK_LEN: usize = 0x10;

/// Length of the IV prefix of every container.
pub const IV_LEN: usize = 0x10;

/// Length of a [`CipherKey`].
pub const KEY_LEN: usize = 0x10;

/// Length of a [`Digest`].
pub const DIGEST_LEN: usize = 0x10;

/// Integrity digest produced by the engine for one encrypted container.
pub type Digest = [u8; DIGEST_LEN];

// ---------------------------------------------------------------------------
// Engine selectors
// ---------------------------------------------------------------------------

/// Engine mode: keyed vs non-keyed, plus the keyed algorithm generation.
///
/// The discriminants are the raw values the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fixed, non-keyed mode used by saves without a game key.
    Plain = 1,
    /// Keyed mode written by titles built against older SDKs.
    Keyed = 3,
    /// Keyed mode written by titles built against SDK 4 and later.
    KeyedV2 = 5,
}

impl Mode {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn is_keyed(self) -> bool {
        !matches!(self, Mode::Plain)
    }

    /// Pick the mode for an operation: non-keyed without a key, otherwise the
    /// keyed mode of `generation`.
    pub fn select(key: Option<&CipherKey>, generation: KeyedGeneration) -> Self {
        match (key, generation) {
            (None, _) => Mode::Plain,
            (Some(_), KeyedGeneration::Legacy) => Mode::Keyed,
            (Some(_), KeyedGeneration::Current) => Mode::KeyedV2,
        }
    }
}

/// Which keyed algorithm generation to use when a game key is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyedGeneration {
    Legacy,
    #[default]
    Current,
}

/// Direction passed to the engine when its digest context is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt = 1,
    Decrypt = 2,
}

impl Direction {
    pub fn code(self) -> u32 {
        self as u32
    }
}

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Errors produced while parsing key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("key is not valid hex")]
    InvalidHex,
}

/// A 16-byte game key (or any other 16-byte secret handed to the engine).
///
/// The bytes are zeroed when the value is dropped and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice that must be exactly [`KEY_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice has the wrong length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parse 32 hex characters; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] for the wrong number of characters
    /// and [`KeyError::InvalidHex`] for non-hex input.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let s = s.trim();
        if s.len() != KEY_LEN * 2 {
            return Err(KeyError::InvalidLength(s.len() / 2));
        }
        let mut out = [0u8; KEY_LEN];
        hex::decode_to_slice(s, &mut out).map_err(|_| KeyError::InvalidHex)?;
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Zeroize for CipherKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for CipherKey {}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Operation report
// ---------------------------------------------------------------------------

/// Outcome of one operation, printed as JSON by the `savedata` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// `"encrypt"` or `"decrypt"`.
    pub operation: String,
    /// `"ok"` or `"failed"`.
    pub status: String,
    /// Bytes written to the output file on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    /// Signed legacy error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationReport {
    pub fn success(operation: impl Into<String>, bytes_written: u64) -> Self {
        Self {
            operation: operation.into(),
            status: "ok".into(),
            bytes_written: Some(bytes_written),
            error_code: None,
            message: None,
        }
    }

    pub fn failure(operation: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: "failed".into(),
            bytes_written: None,
            error_code: Some(code),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes_and_selection() {
        assert_eq!(Mode::Plain.code(), 1);
        assert_eq!(Mode::Keyed.code(), 3);
        assert_eq!(Mode::KeyedV2.code(), 5);

        let key = CipherKey::new([7u8; KEY_LEN]);
        assert_eq!(Mode::select(None, KeyedGeneration::Current), Mode::Plain);
        assert_eq!(Mode::select(Some(&key), KeyedGeneration::Legacy), Mode::Keyed);
        assert_eq!(Mode::select(Some(&key), KeyedGeneration::Current), Mode::KeyedV2);
        assert!(!Mode::Plain.is_keyed());
        assert!(Mode::KeyedV2.is_keyed());
    }

    #[test]
    fn direction_codes() {
        assert_eq!(Direction::Encrypt.code(), 1);
        assert_eq!(Direction::Decrypt.code(), 2);
    }

    #[test]
    fn key_from_hex() {
        let key = CipherKey::from_hex(" 000102030405060708090a0b0c0d0e0F\n").unwrap();
        assert_eq!(key.as_bytes()[15], 0x0F);
        assert_eq!(CipherKey::from_hex("0011"), Err(KeyError::InvalidLength(2)));
        assert_eq!(
            CipherKey::from_hex("zz0102030405060708090a0b0c0d0e0f"),
            Err(KeyError::InvalidHex)
        );
    }

    #[test]
    fn key_from_slice_checks_length() {
        assert!(CipherKey::from_slice(&[0u8; KEY_LEN]).is_ok());
        assert_eq!(
            CipherKey::from_slice(&[0u8; 15]),
            Err(KeyError::InvalidLength(15))
        );
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = CipherKey::new([0xAB; KEY_LEN]);
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.to_lowercase().contains("ab"));
    }

    #[test]
    fn key_wipes_its_bytes() {
        fn zeroized_on_drop<T: ZeroizeOnDrop>() {}
        zeroized_on_drop::<CipherKey>();

        let mut key = CipherKey::new([0x5A; KEY_LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn keyed_generation_deserialises_lowercase() {
        let g: KeyedGeneration = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(g, KeyedGeneration::Legacy);
        assert_eq!(KeyedGeneration::default(), KeyedGeneration::Current);
    }

    #[test]
    fn report_omits_empty_fields() {
        let ok = serde_json::to_value(OperationReport::success("decrypt", 32)).unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["bytes_written"], 32);
        assert!(ok.get("error_code").is_none());

        let failed =
            serde_json::to_value(OperationReport::failure("encrypt", -3, "bad blob")).unwrap();
        assert_eq!(failed["error_code"], -3);
        assert!(failed.get("bytes_written").is_none());
    }
}
