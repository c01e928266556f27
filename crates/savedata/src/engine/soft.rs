//! [`SoftEngine`]: a host-side emulation of the staged engine contract.
//!
//! Produces self-consistent containers so saves can be built and checked
//! without console hardware. The output is **not** interchangeable with
//! containers written by real firmware.
//!
//! # Construction
//!
//! All keys are HMAC-SHA256 subkeys of a 16-byte device secret, separated by
//! label, mode, and (for keyed modes) the game key. The game key reaches the
//! transform through `set_index` and the digest through `create_list`, so a
//! keyed body cannot be read or verified without it.
//!
//! ```text
//! IV slot   [0..8) random nonce | [8..16) tag = MAC(nonce, padded plaintext)
//! body      plaintext XOR HMAC-CTR keystream keyed by mode and game key,
//!           seeded by the IV slot
//! ```
//!
//! `verify` recomputes the tag over the registered plaintext extent, so a
//! flipped ciphertext byte, a flipped IV byte, or the wrong game key all fail
//! there. Nonce and tag are 64 bits each; this is an emulator, not a vault.

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, TryRngCore};
use sha2::Sha256;

use common::protocol::{BLOCK_LEN, IV_LEN, KEY_LEN};
use common::{CipherKey, Digest, Direction, Mode};

use super::{CryptoEngine, EngineError};

type HmacSha256 = Hmac<Sha256>;

/// Device secret used when none is configured.
pub const DEFAULT_DEVICE_KEY: [u8; KEY_LEN] = *b"savedata-device!";

const NONCE_LEN: usize = 8;
const TAG_LEN: usize = IV_LEN - NONCE_LEN;

/// Block-transform state threaded through `set_index`, `remove_value`, and
/// `get_last_digest`.
#[derive(Default)]
pub struct SoftTransformContext {
    mode: Option<Mode>,
    key: Option<CipherKey>,
    seeded: bool,
    chain: [u8; IV_LEN],
    counter: u64,
    accumulator: [u8; 16],
    transformed: bool,
}

/// Digest state threaded through `create_list`, `set_member`, and `verify`.
#[derive(Default)]
pub struct SoftDigestContext {
    mode: Option<Mode>,
    key: Option<CipherKey>,
    tag: [u8; TAG_LEN],
    accumulator: [u8; 16],
    registered: bool,
}

/// Software implementation of [`CryptoEngine`].
///
/// Each container carries an 8-byte random nonce and an 8-byte (64-bit)
/// authentication tag in its IV slot. Tags of that length suit host tooling
/// and tests; they are not a substitute for console firmware.
#[derive(Debug, Clone)]
pub struct SoftEngine {
    device_key: CipherKey,
}

impl SoftEngine {
    pub fn new(device_key: CipherKey) -> Self {
        Self { device_key }
    }

    fn subkey(
        &self,
        label: &[u8],
        mode: Mode,
        key: Option<&CipherKey>,
    ) -> Result<[u8; 32], EngineError> {
        let mode_code = mode.code().to_le_bytes();
        let key_bytes: &[u8] = key.map(|k| &k.as_bytes()[..]).unwrap_or(&[]);
        mac(self.device_key.as_bytes(), &[label, &mode_code, key_bytes])
    }
}

impl Default for SoftEngine {
    fn default() -> Self {
        Self::new(CipherKey::new(DEFAULT_DEVICE_KEY))
    }
}

impl CryptoEngine for SoftEngine {
    type TransformContext = SoftTransformContext;
    type DigestContext = SoftDigestContext;

    fn set_index(
        &self,
        ctx: &mut SoftTransformContext,
        mode: Mode,
        key: Option<CipherKey>,
    ) -> Result<(), EngineError> {
        const OP: &str = "set_index";
        if ctx.mode.is_some() {
            return Err(EngineError::new(OP, "context already initialised"));
        }
        if mode.is_keyed() != key.is_some() {
            return Err(EngineError::new(OP, "key presence does not match mode"));
        }
        ctx.mode = Some(mode);
        ctx.key = key;
        Ok(())
    }

    fn create_list(
        &self,
        ctx: &mut SoftDigestContext,
        mode: Mode,
        direction: Direction,
        buffer: &mut [u8],
        key: Option<CipherKey>,
    ) -> Result<(), EngineError> {
        const OP: &str = "create_list";
        if ctx.mode.is_some() {
            return Err(EngineError::new(OP, "context already initialised"));
        }
        if mode.is_keyed() != key.is_some() {
            return Err(EngineError::new(OP, "key presence does not match mode"));
        }
        if buffer.len() < IV_LEN || buffer.len() % BLOCK_LEN != 0 {
            return Err(EngineError::new(OP, "buffer is not a block-aligned IV frame"));
        }

        let k = self.subkey(b"member", mode, key.as_ref())?;
        let mut nonce = [0u8; NONCE_LEN];
        match direction {
            Direction::Encrypt => {
                OsRng
                    .try_fill_bytes(&mut nonce)
                    .map_err(|e| EngineError::new(OP, e.to_string()))?;
                let start = truncate16(&mac(&k, &[b"nonce", &nonce])?);
                let sealed = truncate16(&mac(&k, &[b"member", &start, &buffer[IV_LEN..]])?);
                buffer[..NONCE_LEN].copy_from_slice(&nonce);
                buffer[NONCE_LEN..IV_LEN].copy_from_slice(&sealed[..TAG_LEN]);
            }
            Direction::Decrypt => {
                nonce.copy_from_slice(&buffer[..NONCE_LEN]);
            }
        }
        ctx.tag.copy_from_slice(&buffer[NONCE_LEN..IV_LEN]);
        ctx.accumulator = truncate16(&mac(&k, &[b"nonce", &nonce])?);
        ctx.mode = Some(mode);
        ctx.key = key;
        Ok(())
    }

    fn remove_value(
        &self,
        ctx: &mut SoftTransformContext,
        data: &mut [u8],
    ) -> Result<(), EngineError> {
        const OP: &str = "remove_value";
        let mode = ctx
            .mode
            .ok_or_else(|| EngineError::new(OP, "set_index has not run"))?;
        if data.is_empty() || data.len() % BLOCK_LEN != 0 {
            return Err(EngineError::new(OP, "length is not a non-zero multiple of 16"));
        }

        // The first call carries the IV slot and seeds the chain.
        if !ctx.seeded {
            if data.len() != IV_LEN {
                return Err(EngineError::new(OP, "first call must carry the 16-byte IV"));
            }
            ctx.chain.copy_from_slice(data);
            ctx.seeded = true;
            return Ok(());
        }

        let k = self.subkey(b"transform", mode, ctx.key.as_ref())?;
        for block in data.chunks_exact_mut(BLOCK_LEN) {
            let ks = mac(&k, &[b"keystream", &ctx.chain, &ctx.counter.to_be_bytes()])?;
            block.iter_mut().zip(ks.iter()).for_each(|(b, s)| *b ^= s);
            ctx.counter += 1;
        }
        ctx.accumulator = truncate16(&mac(&k, &[b"accumulate", &ctx.accumulator, data])?);
        ctx.transformed = true;
        Ok(())
    }

    fn set_member(&self, ctx: &mut SoftDigestContext, data: &[u8]) -> Result<(), EngineError> {
        const OP: &str = "set_member";
        let mode = ctx
            .mode
            .ok_or_else(|| EngineError::new(OP, "create_list has not run"))?;
        if data.len() % BLOCK_LEN != 0 {
            return Err(EngineError::new(OP, "length is not a multiple of 16"));
        }
        let k = self.subkey(b"member", mode, ctx.key.as_ref())?;
        ctx.accumulator = truncate16(&mac(&k, &[b"member", &ctx.accumulator, data])?);
        ctx.registered = true;
        Ok(())
    }

    fn verify(&self, ctx: &mut SoftDigestContext) -> Result<(), EngineError> {
        const OP: &str = "verify";
        if ctx.mode.is_none() {
            return Err(EngineError::new(OP, "create_list has not run"));
        }
        if !ctx.registered {
            return Err(EngineError::new(OP, "no extent registered"));
        }
        if ctx.accumulator[..TAG_LEN] != ctx.tag {
            return Err(EngineError::new(OP, "digest mismatch"));
        }
        Ok(())
    }

    fn get_last_digest(
        &self,
        ctx: &mut SoftTransformContext,
        key: Option<CipherKey>,
    ) -> Result<Digest, EngineError> {
        const OP: &str = "get_last_digest";
        let mode = ctx
            .mode
            .ok_or_else(|| EngineError::new(OP, "set_index has not run"))?;
        if !ctx.transformed {
            return Err(EngineError::new(OP, "no transform to digest"));
        }
        if mode.is_keyed() != key.is_some() {
            return Err(EngineError::new(OP, "key presence does not match mode"));
        }
        let k = self.subkey(b"digest", mode, key.as_ref())?;
        Ok(truncate16(&mac(&k, &[&ctx.accumulator, &ctx.chain])?))
    }
}

fn mac(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], EngineError> {
    let mut m = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| EngineError::new("key schedule", e.to_string()))?;
    for part in parts {
        m.update(part);
    }
    Ok(m.finalize().into_bytes().into())
}

fn truncate16(full: &[u8; 32]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&full[..16]);
    out
}
