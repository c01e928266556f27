//! PSF (`param.sfo`) lookup of per-file digest slots.
//!
//! # Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | `0x00` | 4    | Magic `\0PSF` |
//! | `0x04` | 4    | Version |
//! | `0x08` | 4    | Key table start |
//! | `0x0C` | 4    | Data table start |
//! | `0x10` | 4    | Entry count |
//! | `0x14` | 16×n | Index entries |
//!
//! Index entry: `key_offset u16, data_fmt u16, data_len u32, data_max_len u32,
//! data_offset u32`, all little-endian. Key offsets are relative to the key
//! table, data offsets to the data table.
//!
//! The `SAVEDATA_FILE_LIST` parameter is an array of 32-byte records:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | `0x00` | 13   | Filename, NUL padded |
//! | `0x0D` | 16   | Digest |
//! | `0x1D` | 3    | Padding |

use std::ops::Range;

use common::protocol::DIGEST_LEN;
use common::MetadataStage;
use tracing::debug;

use super::{DigestTable, DigestVariant};

const MAGIC: [u8; 4] = *b"\0PSF";
const HEADER_LEN: usize = 0x14;
const INDEX_ENTRY_LEN: usize = 0x10;

pub const FILE_LIST_KEY: &str = "SAVEDATA_FILE_LIST";
pub const FILE_RECORD_LEN: usize = 0x20;
pub const FILE_NAME_LEN: usize = 0x0D;

/// [`DigestTable`] over the PSF parameter format.
///
/// Every digest variant lives in the same `SAVEDATA_FILE_LIST` slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfoTable;

impl DigestTable for SfoTable {
    fn locate(
        &self,
        blob: &[u8],
        filename: &str,
        variant: DigestVariant,
    ) -> Result<Range<usize>, MetadataStage> {
        let list = find_param(blob, FILE_LIST_KEY)?.ok_or(MetadataStage::FileListMissing)?;

        let name = filename.as_bytes();
        if name.is_empty() || name.len() > FILE_NAME_LEN {
            return Err(MetadataStage::EntryNotFound);
        }

        let mut start = list.start;
        while start + FILE_RECORD_LEN <= list.end {
            let field = &blob[start..start + FILE_NAME_LEN];
            let stored = field.split(|&b| b == 0).next().unwrap_or_default();
            if stored == name {
                let slot = start + FILE_NAME_LEN;
                debug!(filename, variant = variant.get(), slot, "file list digest slot");
                return Ok(slot..slot + DIGEST_LEN);
            }
            start += FILE_RECORD_LEN;
        }
        Err(MetadataStage::EntryNotFound)
    }
}

/// Byte range of the parameter named `key`, or `None` if the index has no
/// such key.
fn find_param(blob: &[u8], key: &str) -> Result<Option<Range<usize>>, MetadataStage> {
    if blob.get(..4) != Some(&MAGIC[..]) {
        return Err(MetadataStage::MalformedTable);
    }
    let key_table = le_u32(blob, 0x08)?;
    let data_table = le_u32(blob, 0x0C)?;
    let count = le_u32(blob, 0x10)?;

    for i in 0..count {
        let entry = HEADER_LEN + i * INDEX_ENTRY_LEN;
        let key_offset = le_u16(blob, entry)?;
        let data_len = le_u32(blob, entry + 0x04)?;
        let data_offset = le_u32(blob, entry + 0x0C)?;

        if read_key(blob, key_table + key_offset)? != key.as_bytes() {
            continue;
        }

        let start = data_table + data_offset;
        let end = start + data_len;
        if end > blob.len() {
            return Err(MetadataStage::MalformedTable);
        }
        return Ok(Some(start..end));
    }
    Ok(None)
}

fn read_key(blob: &[u8], offset: usize) -> Result<&[u8], MetadataStage> {
    let tail = blob.get(offset..).ok_or(MetadataStage::MalformedTable)?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(MetadataStage::MalformedTable)?;
    Ok(&tail[..len])
}

fn le_u16(blob: &[u8], offset: usize) -> Result<usize, MetadataStage> {
    let b = blob
        .get(offset..offset + 2)
        .ok_or(MetadataStage::MalformedTable)?;
    Ok(u16::from_le_bytes([b[0], b[1]]) as usize)
}

fn le_u32(blob: &[u8], offset: usize) -> Result<usize, MetadataStage> {
    let b = blob
        .get(offset..offset + 4)
        .ok_or(MetadataStage::MalformedTable)?;
    usize::try_from(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .map_err(|_| MetadataStage::MalformedTable)
}
