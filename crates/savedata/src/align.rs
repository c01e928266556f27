//! Block alignment for engine buffers.

use common::protocol::BLOCK_LEN;

/// Round `v` up to the next multiple of the 16-byte engine block.
///
/// Values already on a block boundary are returned unchanged.
#[inline]
pub fn align16(v: usize) -> usize {
    ((v + (BLOCK_LEN - 1)) >> 4) << 4
}
