//! The fixed-size metadata blob that accompanies a save directory.
//!
//! The blob records a 16-byte digest per data filename. Its size is fixed and
//! the byte at [`MODE_SELECTOR_OFFSET`] selects which digest variant applies
//! (high nibble). Slot lookup is delegated to a [`DigestTable`] so the table
//! schema stays out of the update logic.

pub mod sfo;

use std::ops::Range;

use common::protocol::DIGEST_LEN;
use common::{Digest, MetadataStage, SavedataError};
use tracing::debug;

pub use sfo::SfoTable;

/// Exact size of a metadata blob.
pub const BLOB_LEN: usize = 0x1330;

/// Offset of the byte whose high nibble selects the digest variant.
pub const MODE_SELECTOR_OFFSET: usize = 0x11B0;

/// Digest variant selected by the blob's mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestVariant(u8);

impl DigestVariant {
    pub fn from_selector(byte: u8) -> Self {
        Self(byte >> 4)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Finds the digest slot recorded for a data filename.
pub trait DigestTable {
    /// Return the byte range of the 16-byte digest slot for `filename`.
    ///
    /// # Errors
    ///
    /// Returns the [`MetadataStage`] describing why the slot could not be
    /// located.
    fn locate(
        &self,
        blob: &[u8],
        filename: &str,
        variant: DigestVariant,
    ) -> Result<Range<usize>, MetadataStage>;
}

/// A metadata blob of exactly [`BLOB_LEN`] bytes.
#[derive(Clone)]
pub struct MetadataBlob {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for MetadataBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataBlob")
            .field("len", &self.bytes.len())
            .field("variant", &self.digest_variant())
            .finish()
    }
}

impl MetadataBlob {
    /// Take ownership of a blob read from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SavedataError::InvalidBlobSize`] unless the blob is exactly
    /// [`BLOB_LEN`] bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SavedataError> {
        if bytes.len() != BLOB_LEN {
            return Err(SavedataError::InvalidBlobSize(bytes.len()));
        }
        Ok(Self { bytes })
    }

    pub fn digest_variant(&self) -> DigestVariant {
        DigestVariant::from_selector(self.bytes[MODE_SELECTOR_OFFSET])
    }

    /// Record `digest` for `filename` in the slot the table points at.
    ///
    /// # Errors
    ///
    /// Propagates the table's lookup failure as [`SavedataError::Metadata`].
    pub fn update_digest<T: DigestTable + ?Sized>(
        &mut self,
        table: &T,
        filename: &str,
        digest: &Digest,
    ) -> Result<(), SavedataError> {
        let variant = self.digest_variant();
        let slot = table.locate(&self.bytes, filename, variant)?;
        if slot.len() != DIGEST_LEN || slot.end > self.bytes.len() {
            return Err(MetadataStage::MalformedTable.into());
        }
        self.bytes[slot.clone()].copy_from_slice(digest);
        debug!(
            filename,
            variant = variant.get(),
            offset = slot.start,
            "metadata digest updated"
        );
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
