//! The staged crypto engine the codec drives.
//!
//! The engine is an external capability (console firmware, or the software
//! emulation in [`soft`]). Its cipher and digest construction are opaque to
//! this crate; only the call contract below is relied upon.
//!
//! # Call contract
//!
//! | Operation          | Context   | Effect |
//! |--------------------|-----------|--------|
//! | `set_index`        | transform | Initialise the block transform for a mode and optional game key |
//! | `create_list`      | digest    | Encrypt: write a fresh IV into `buffer[0..16]`. Decrypt: consume the IV there |
//! | `remove_value`     | transform | Transform `data` in place; length is a multiple of 16 |
//! | `set_member`       | digest    | Register the plaintext extent the digest covers |
//! | `verify`           | digest    | Finalise the digest context; fails on inconsistency or authentication mismatch |
//! | `get_last_digest`  | transform | Extract the 16-byte digest of the latest transform (encrypt only) |
//!
//! Both context types start zero-initialised (`Default`) at the top of every
//! encrypt or decrypt call and are dropped when it returns. No call is retried.

pub mod soft;

use common::{CipherKey, Digest, Direction, Mode};
use thiserror::Error;

/// Failure reported by a single engine operation.
///
/// The codec maps it to the stage it occurred at; the message is for logs.
#[derive(Debug, Error)]
#[error("engine operation `{operation}` failed: {reason}")]
pub struct EngineError {
    pub operation: &'static str,
    pub reason: String,
}

impl EngineError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Staged operations exposed by the crypto engine.
#[cfg_attr(test, mockall::automock(type TransformContext = (); type DigestContext = ();))]
pub trait CryptoEngine {
    /// Call-scoped state for the block transform.
    type TransformContext: Default;
    /// Call-scoped state for digest accumulation and IV handling.
    type DigestContext: Default;

    /// Initialise the block-transform context for `mode`.
    ///
    /// `key` must be present exactly when `mode` is keyed; it keys the body
    /// transform.
    fn set_index(
        &self,
        ctx: &mut Self::TransformContext,
        mode: Mode,
        key: Option<CipherKey>,
    ) -> Result<(), EngineError>;

    /// Create (encrypt) or consume (decrypt) the IV in `buffer[0..16]` and
    /// initialise the digest context.
    ///
    /// `buffer` covers the IV slot and the body behind it. `key` must be
    /// present exactly when `mode` is keyed.
    fn create_list(
        &self,
        ctx: &mut Self::DigestContext,
        mode: Mode,
        direction: Direction,
        buffer: &mut [u8],
        key: Option<CipherKey>,
    ) -> Result<(), EngineError>;

    /// Apply the block transform to `data` in place.
    fn remove_value(
        &self,
        ctx: &mut Self::TransformContext,
        data: &mut [u8],
    ) -> Result<(), EngineError>;

    /// Register the plaintext extent covered by the digest.
    fn set_member(&self, ctx: &mut Self::DigestContext, data: &[u8]) -> Result<(), EngineError>;

    /// Finalise and validate the digest context.
    fn verify(&self, ctx: &mut Self::DigestContext) -> Result<(), EngineError>;

    /// Extract the digest of the most recent transform.
    fn get_last_digest(
        &self,
        ctx: &mut Self::TransformContext,
        key: Option<CipherKey>,
    ) -> Result<Digest, EngineError>;
}
