//! [`ContainerBuffer`]: the owned working buffer threaded through one codec call.
//!
//! ```text
//! plaintext form   [0 .. len) data | [len .. aligned) zero pad | 16 bytes headroom
//! container form   [0 .. 16) IV    | [16 .. 16 + aligned) ciphertext
//! ```
//!
//! The buffer tracks two lengths: the logical data length and the block
//! aligned length. Both move by exactly 16 when the IV is added or removed.

use std::ops::Range;

use common::protocol::IV_LEN;
use common::SavedataError;

use crate::align::align16;

/// Zero-filled, block-padded byte buffer with room for the IV.
pub struct ContainerBuffer {
    bytes: Vec<u8>,
    len: usize,
    aligned_len: usize,
}

impl ContainerBuffer {
    /// Load plaintext, zero-pad it to the block size, and reserve 16 bytes of
    /// headroom for the IV that encryption prepends.
    ///
    /// # Errors
    ///
    /// Returns [`SavedataError::Memory`] if the buffer cannot be allocated.
    pub fn from_plaintext(data: &[u8]) -> Result<Self, SavedataError> {
        let aligned_len = align16(data.len());
        let mut bytes = zeroed(aligned_len + IV_LEN)?;
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
            aligned_len,
        })
    }

    /// Load an encrypted container, zero-padding a ragged tail to the block
    /// size.
    ///
    /// # Errors
    ///
    /// Returns [`SavedataError::Memory`] if the buffer cannot be allocated.
    pub fn from_container(data: &[u8]) -> Result<Self, SavedataError> {
        let aligned_len = align16(data.len());
        let mut bytes = zeroed(aligned_len)?;
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
            aligned_len,
        })
    }

    /// Logical data length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn aligned_len(&self) -> usize {
        self.aligned_len
    }

    /// The logical bytes `[0, len)`.
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The block-aligned bytes `[0, aligned_len)`.
    pub fn aligned(&self) -> &[u8] {
        &self.bytes[..self.aligned_len]
    }

    pub fn into_data(mut self) -> Vec<u8> {
        self.bytes.truncate(self.len);
        self.bytes
    }

    pub fn into_aligned(mut self) -> Vec<u8> {
        self.bytes.truncate(self.aligned_len);
        self.bytes
    }

    /// Account for an IV that has just been removed from the front.
    pub(crate) fn shrink_for_iv(&mut self) {
        self.len = self.len.saturating_sub(IV_LEN);
        self.aligned_len = self.aligned_len.saturating_sub(IV_LEN);
    }

    /// Account for an IV that has just been added to the front.
    pub(crate) fn grow_for_iv(&mut self) {
        self.len += IV_LEN;
        self.aligned_len += IV_LEN;
    }

    /// Move `[0, aligned_len)` right by `n` bytes. The regions may overlap.
    ///
    /// The buffer must have `n` bytes of headroom past `aligned_len`.
    pub(crate) fn shift_right(&mut self, n: usize) {
        debug_assert!(self.bytes.len() >= self.aligned_len + n);
        self.bytes.copy_within(0..self.aligned_len, n);
    }

    /// Move `[n, n + count)` to the front. The regions may overlap.
    pub(crate) fn shift_left(&mut self, n: usize, count: usize) {
        self.bytes.copy_within(n..n + count, 0);
    }

    /// The IV slot at the front of the buffer.
    pub(crate) fn iv_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..IV_LEN]
    }

    /// The `len` body bytes that follow the IV slot.
    pub(crate) fn body_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.bytes[IV_LEN..IV_LEN + len]
    }

    /// The IV slot and the `len` body bytes behind it.
    pub(crate) fn framed_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.bytes[..IV_LEN + len]
    }

    pub(crate) fn zero(&mut self, range: Range<usize>) {
        self.bytes[range].fill(0);
    }
}

fn zeroed(size: usize) -> Result<Vec<u8>, SavedataError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(size)
        .map_err(|_| SavedataError::Memory(size))?;
    bytes.resize(size, 0);
    Ok(bytes)
}
