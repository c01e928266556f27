//! [`Savedata`]: file-level encrypt and decrypt.
//!
//! Each operation reads its inputs whole, runs the codec over an owned
//! buffer, and writes its outputs only after every crypto and metadata step
//! has succeeded. Nothing is shared between calls.

use std::path::Path;

use common::protocol::KeyedGeneration;
use common::{CipherKey, Mode, SavedataError};
use tracing::{debug, info};

use crate::buffer::ContainerBuffer;
use crate::codec;
use crate::engine::CryptoEngine;
use crate::fsio;
use crate::metadata::{DigestTable, MetadataBlob, SfoTable};

/// Savedata operations over a crypto engine and a metadata schema.
pub struct Savedata<E, T = SfoTable> {
    engine: E,
    table: T,
    generation: KeyedGeneration,
}

impl<E: CryptoEngine> Savedata<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            table: SfoTable,
            generation: KeyedGeneration::default(),
        }
    }
}

impl<E: CryptoEngine, T: DigestTable> Savedata<E, T> {
    /// Use `generation`'s keyed mode whenever a game key is supplied.
    pub fn with_keyed_generation(mut self, generation: KeyedGeneration) -> Self {
        self.generation = generation;
        self
    }

    /// Swap the metadata schema accessor.
    pub fn with_table<U: DigestTable>(self, table: U) -> Savedata<E, U> {
        Savedata {
            engine: self.engine,
            table,
            generation: self.generation,
        }
    }

    fn mode(&self, key: Option<&CipherKey>) -> Mode {
        Mode::select(key, self.generation)
    }

    /// Decrypt a container held in memory.
    ///
    /// The result keeps the block padding: its length is the container
    /// length rounded up to 16, minus 16.
    pub fn decrypt_bytes(
        &self,
        container: &[u8],
        key: Option<&CipherKey>,
    ) -> Result<Vec<u8>, SavedataError> {
        let mode = self.mode(key);
        let mut buf = ContainerBuffer::from_container(container)?;
        codec::decrypt(&self.engine, mode, &mut buf, key)?;
        Ok(buf.into_data())
    }

    /// Encrypt plaintext held in memory and record its digest for
    /// `data_filename` in `blob`.
    ///
    /// Returns the full container: IV followed by the padded ciphertext.
    /// `blob` is left untouched on failure.
    pub fn encrypt_bytes(
        &self,
        plaintext: &[u8],
        blob: &mut MetadataBlob,
        data_filename: &str,
        key: Option<&CipherKey>,
    ) -> Result<Vec<u8>, SavedataError> {
        let mode = self.mode(key);
        let mut buf = ContainerBuffer::from_plaintext(plaintext)?;
        let digest = codec::encrypt(&self.engine, mode, &mut buf, key)?;
        blob.update_digest(&self.table, data_filename, &digest)?;
        Ok(buf.into_aligned())
    }

    /// Decrypt the container at `input` and write the padded plaintext to
    /// `output`. Returns the number of bytes written.
    pub fn decrypt(
        &self,
        output: &Path,
        input: &Path,
        key: Option<&CipherKey>,
    ) -> Result<u64, SavedataError> {
        let container = fsio::read_file(input)?;
        debug!(input = %input.display(), len = container.len(), "container read");

        let plaintext = self.decrypt_bytes(&container, key)?;
        fsio::write_file(output, &plaintext)?;

        info!(
            output = %output.display(),
            bytes = plaintext.len(),
            mode = self.mode(key).code(),
            "savedata decrypted"
        );
        Ok(plaintext.len() as u64)
    }

    /// Encrypt the file at `plaintext` into `output` and update the digest
    /// recorded for `data_filename` in the metadata blob at `metadata`.
    ///
    /// The blob size is checked before any crypto work. Returns the number of
    /// container bytes written.
    pub fn encrypt(
        &self,
        plaintext: &Path,
        output: &Path,
        data_filename: &str,
        metadata: &Path,
        key: Option<&CipherKey>,
    ) -> Result<u64, SavedataError> {
        let data = fsio::read_file(plaintext)?;
        let mut blob = MetadataBlob::from_bytes(fsio::read_bytes(metadata)?)?;
        debug!(
            input = %plaintext.display(),
            len = data.len(),
            variant = blob.digest_variant().get(),
            "plaintext and metadata read"
        );

        let container = self.encrypt_bytes(&data, &mut blob, data_filename, key)?;

        fsio::write_file(output, &container)?;
        fsio::atomic_write(metadata, blob.as_bytes())?;

        info!(
            output = %output.display(),
            bytes = container.len(),
            data_filename,
            mode = self.mode(key).code(),
            "savedata encrypted"
        );
        Ok(container.len() as u64)
    }
}

/// Collapse an operation result into the signed convention: the byte count
/// on success, the negative error code on failure.
pub fn to_code(result: &Result<u64, SavedataError>) -> i64 {
    match result {
        Ok(n) => i64::try_from(*n).unwrap_or(i64::MAX),
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use common::{DecryptStage, MetadataStage};
    use tempfile::TempDir;

    use super::*;
    use crate::engine::soft::SoftEngine;
    use crate::engine::{EngineError, MockCryptoEngine};
    use crate::metadata::sfo::fixture;
    use crate::metadata::BLOB_LEN;

    fn blob() -> MetadataBlob {
        MetadataBlob::from_bytes(fixture::blob(&["ICON0.PNG", "DATA.BIN"], 0x10)).unwrap()
    }

    const SLOT: std::ops::Range<usize> = 0x550 + 0x20 + 0x0D..0x550 + 0x20 + 0x1D;

    #[test]
    fn encrypt_bytes_records_digest_and_round_trips() {
        let sd = Savedata::new(SoftEngine::default());
        let mut meta = blob();
        let plaintext: Vec<u8> = (0..48u8).collect();

        let container = sd
            .encrypt_bytes(&plaintext, &mut meta, "DATA.BIN", None)
            .unwrap();
        assert_eq!(container.len(), 64);
        assert_ne!(&meta.as_bytes()[SLOT], &[0u8; 16]);

        assert_eq!(sd.decrypt_bytes(&container, None).unwrap(), plaintext);
    }

    #[test]
    fn keyed_round_trip_needs_the_key() {
        let sd = Savedata::new(SoftEngine::default());
        let key = CipherKey::new([7; 16]);
        let mut meta = blob();

        let container = sd
            .encrypt_bytes(&[0x55; 32], &mut meta, "DATA.BIN", Some(&key))
            .unwrap();
        assert_eq!(sd.decrypt_bytes(&container, Some(&key)).unwrap(), vec![0x55; 32]);
        assert!(sd.decrypt_bytes(&container, None).is_err());
    }

    #[test]
    fn unknown_filename_leaves_blob_untouched() {
        let sd = Savedata::new(SoftEngine::default());
        let mut meta = blob();
        let before = meta.as_bytes().to_vec();

        let err = sd
            .encrypt_bytes(&[1; 16], &mut meta, "OTHER.BIN", None)
            .unwrap_err();
        assert!(matches!(
            err,
            SavedataError::Metadata(MetadataStage::EntryNotFound)
        ));
        assert_eq!(err.code(), -303);
        assert_eq!(meta.as_bytes(), before.as_slice());
    }

    #[test]
    fn keyed_generation_picks_engine_mode() {
        for (generation, expected) in [
            (KeyedGeneration::Legacy, Mode::Keyed),
            (KeyedGeneration::Current, Mode::KeyedV2),
        ] {
            let mut engine = MockCryptoEngine::new();
            engine
                .expect_set_index()
                .withf(move |_, mode, key| *mode == expected && key.is_some())
                .times(1)
                .returning(|_, _, _| Err(EngineError::new("set_index", "stop")));
            let sd = Savedata::new(engine).with_keyed_generation(generation);
            let err = sd
                .decrypt_bytes(&[0; 32], Some(&CipherKey::new([1; 16])))
                .unwrap_err();
            assert!(matches!(
                err,
                SavedataError::Decrypt(DecryptStage::IndexSetupFailure)
            ));
        }
    }

    #[test]
    fn no_key_selects_plain_mode() {
        let mut engine = MockCryptoEngine::new();
        engine
            .expect_set_index()
            .withf(|_, mode, key| *mode == Mode::Plain && key.is_none())
            .times(1)
            .returning(|_, _, _| Err(EngineError::new("set_index", "stop")));
        let sd = Savedata::new(engine);
        assert!(sd.decrypt_bytes(&[0; 32], None).is_err());
    }

    #[test]
    fn wrong_blob_size_fails_before_crypto() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.bin");
        let out = dir.path().join("DATA.BIN");
        let sfo = dir.path().join("PARAM.SFO");
        fs::write(&plain, [1u8; 20]).unwrap();

        // Any engine call would panic: the mock has no expectations.
        let sd = Savedata::new(MockCryptoEngine::new());
        for len in [0usize, 100, BLOB_LEN + 1] {
            fs::write(&sfo, vec![0u8; len]).unwrap();
            let err = sd.encrypt(&plain, &out, "DATA.BIN", &sfo, None).unwrap_err();
            assert!(matches!(err, SavedataError::InvalidBlobSize(n) if n == len));
            assert_eq!(err.code(), -3);
        }
        assert!(!out.exists());
    }

    #[test]
    fn failed_encrypt_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.bin");
        let out = dir.path().join("DATA.BIN");
        let sfo = dir.path().join("PARAM.SFO");
        fs::write(&plain, [1u8; 20]).unwrap();
        let original = fixture::blob(&["DATA.BIN"], 0x10);
        fs::write(&sfo, &original).unwrap();

        let sd = Savedata::new(SoftEngine::default());
        let err = sd.encrypt(&plain, &out, "NOPE.BIN", &sfo, None).unwrap_err();
        assert_eq!(err.code(), -303);
        assert!(!out.exists());
        assert_eq!(fs::read(&sfo).unwrap(), original);
    }

    #[test]
    fn empty_input_is_a_file_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.bin");
        fs::write(&input, b"").unwrap();
        let sd = Savedata::new(MockCryptoEngine::new());
        let result = sd.decrypt(&dir.path().join("out.bin"), &input, None);
        assert_eq!(to_code(&result), -1);
    }

    #[test]
    fn custom_table_places_digest() {
        struct FirstBytes;

        impl DigestTable for FirstBytes {
            fn locate(
                &self,
                _blob: &[u8],
                _filename: &str,
                _variant: crate::metadata::DigestVariant,
            ) -> Result<std::ops::Range<usize>, MetadataStage> {
                Ok(0x20..0x30)
            }
        }

        let sd = Savedata::new(SoftEngine::default()).with_table(FirstBytes);
        let mut meta = MetadataBlob::from_bytes(vec![0; BLOB_LEN]).unwrap();
        sd.encrypt_bytes(&[3; 16], &mut meta, "ANY", None).unwrap();
        assert_ne!(&meta.as_bytes()[0x20..0x30], &[0u8; 16]);
    }

    #[test]
    fn to_code_passes_lengths_through() {
        assert_eq!(to_code(&Ok(48)), 48);
        assert_eq!(to_code(&Ok(0)), 0);
        assert_eq!(
            to_code(&Err(SavedataError::Decrypt(DecryptStage::VerifyFailure))),
            -107
        );
    }
}
