//! Container framing: the ordered engine calls for each direction.
//!
//! ```text
//! encrypt   [plain | pad | headroom] -> shift right 16 -> [IV | ciphertext]
//! decrypt   [IV | ciphertext]        -> shift left 16  -> [plain | pad]
//! ```
//!
//! Each engine failure aborts the call and is reported as the stage it
//! occurred at. Decryption does not strip padding: the output length is the
//! container length minus the IV, whatever the original plaintext length was.

use std::fmt::Debug;

use common::protocol::IV_LEN;
use common::{CipherKey, DecryptStage, Digest, Direction, EncryptStage, Mode};
use tracing::{debug, warn};

use crate::buffer::ContainerBuffer;
use crate::engine::{CryptoEngine, EngineError};

/// Decrypt the container held in `buf` in place.
///
/// On success `buf` holds the zero-padded plaintext at offset 0 and both of
/// its lengths have dropped by 16.
///
/// # Errors
///
/// Returns [`DecryptStage::InsufficientLength`] without touching the engine
/// when the container is not longer than its IV, otherwise the stage of the
/// first failing engine call. [`DecryptStage::VerifyFailure`] means the
/// container was tampered with or the key is wrong.
pub fn decrypt<E: CryptoEngine>(
    engine: &E,
    mode: Mode,
    buf: &mut ContainerBuffer,
    key: Option<&CipherKey>,
) -> Result<(), DecryptStage> {
    if buf.aligned_len() <= IV_LEN {
        return Err(DecryptStage::InsufficientLength);
    }
    buf.shrink_for_iv();
    let body_len = buf.aligned_len();

    let mut transform = E::TransformContext::default();
    let mut digest = E::DigestContext::default();

    stage(
        engine.set_index(&mut transform, mode, key.cloned()),
        DecryptStage::IndexSetupFailure,
    )?;
    stage(
        engine.create_list(
            &mut digest,
            mode,
            Direction::Decrypt,
            buf.framed_mut(body_len),
            key.cloned(),
        ),
        DecryptStage::ListCreationFailure,
    )?;
    stage(
        engine.remove_value(&mut transform, buf.iv_mut()),
        DecryptStage::IvConsumeFailure,
    )?;
    stage(
        engine.remove_value(&mut transform, buf.body_mut(body_len)),
        DecryptStage::BodyTransformFailure,
    )?;
    stage(
        engine.set_member(&mut digest, buf.body_mut(body_len)),
        DecryptStage::DigestRegisterFailure,
    )?;
    stage(engine.verify(&mut digest), DecryptStage::VerifyFailure)?;

    let len = buf.len();
    buf.shift_left(IV_LEN, len);
    debug!(mode = mode.code(), len, "container decrypted");
    Ok(())
}

/// Encrypt the zero-padded plaintext held in `buf` in place and return the
/// digest the metadata blob must record for it.
///
/// On success `buf` holds `IV | ciphertext` and both of its lengths have
/// grown by 16.
///
/// # Errors
///
/// Returns the stage of the first failing engine call.
pub fn encrypt<E: CryptoEngine>(
    engine: &E,
    mode: Mode,
    buf: &mut ContainerBuffer,
    key: Option<&CipherKey>,
) -> Result<Digest, EncryptStage> {
    let data_len = buf.len();
    let body_len = buf.aligned_len();

    buf.shift_right(IV_LEN);

    let mut transform = E::TransformContext::default();
    let mut digest_ctx = E::DigestContext::default();
    buf.iv_mut().fill(0);

    stage(
        engine.create_list(
            &mut digest_ctx,
            mode,
            Direction::Encrypt,
            buf.framed_mut(body_len),
            key.cloned(),
        ),
        EncryptStage::ListCreationFailure,
    )?;
    stage(
        engine.set_index(&mut transform, mode, key.cloned()),
        EncryptStage::IndexSetupFailure,
    )?;
    stage(
        engine.remove_value(&mut transform, buf.iv_mut()),
        EncryptStage::IvTransformFailure,
    )?;
    stage(
        engine.set_member(&mut digest_ctx, buf.body_mut(body_len)),
        EncryptStage::DigestRegisterFailure,
    )?;

    // Pad bytes must be zero before they are encrypted.
    buf.zero(IV_LEN + data_len..IV_LEN + body_len);

    stage(
        engine.remove_value(&mut transform, buf.body_mut(body_len)),
        EncryptStage::BodyTransformFailure,
    )?;
    stage(engine.verify(&mut digest_ctx), EncryptStage::VerifyFailure)?;
    let digest = stage(
        engine.get_last_digest(&mut transform, key.cloned()),
        EncryptStage::DigestExtractFailure,
    )?;

    buf.grow_for_iv();
    debug!(mode = mode.code(), len = buf.aligned_len(), "container encrypted");
    Ok(digest)
}

fn stage<T, S: Copy + Debug>(result: Result<T, EngineError>, stage: S) -> Result<T, S> {
    result.map_err(|e| {
        warn!(stage = ?stage, error = %e, "engine stage failed");
        stage
    })
}
