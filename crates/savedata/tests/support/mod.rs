//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use savedata::metadata::{BLOB_LEN, MODE_SELECTOR_OFFSET};
use tempfile::TempDir;

pub const KEY_TABLE: usize = 0x34;
pub const DATA_TABLE: usize = 0x550;
pub const RECORD_LEN: usize = 0x20;

/// A full-size `param.sfo` with a `SAVEDATA_FILE_LIST` naming `names`.
pub fn param_sfo(names: &[&str], selector: u8) -> Vec<u8> {
    let file_list_len = MODE_SELECTOR_OFFSET - DATA_TABLE;
    let mut b = vec![0u8; BLOB_LEN];

    b[..4].copy_from_slice(b"\0PSF");
    put_u32(&mut b, 0x04, 0x0101);
    put_u32(&mut b, 0x08, KEY_TABLE as u32);
    put_u32(&mut b, 0x0C, DATA_TABLE as u32);
    put_u32(&mut b, 0x10, 2);

    // SAVEDATA_FILE_LIST
    put_u16(&mut b, 0x14, 0);
    put_u16(&mut b, 0x16, 0x0004);
    put_u32(&mut b, 0x18, file_list_len as u32);
    put_u32(&mut b, 0x1C, file_list_len as u32);
    put_u32(&mut b, 0x20, 0);

    // SAVEDATA_PARAMS
    put_u16(&mut b, 0x24, 19);
    put_u16(&mut b, 0x26, 0x0004);
    put_u32(&mut b, 0x28, 0x80);
    put_u32(&mut b, 0x2C, 0x80);
    put_u32(&mut b, 0x30, file_list_len as u32);

    let keys = b"SAVEDATA_FILE_LIST\0SAVEDATA_PARAMS\0";
    b[KEY_TABLE..KEY_TABLE + keys.len()].copy_from_slice(keys);

    for (i, name) in names.iter().enumerate() {
        let rec = DATA_TABLE + i * RECORD_LEN;
        b[rec..rec + name.len()].copy_from_slice(name.as_bytes());
    }
    b[MODE_SELECTOR_OFFSET] = selector;
    b
}

/// Digest slot of the `index`-th file list record.
pub fn digest_slot(index: usize) -> std::ops::Range<usize> {
    let start = DATA_TABLE + index * RECORD_LEN + 0x0D;
    start..start + 16
}

/// A temp save directory holding `plain.bin` and `PARAM.SFO`.
pub struct SaveDir {
    pub dir: TempDir,
}

impl SaveDir {
    pub fn new(plaintext: &[u8], sfo: &[u8]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plain.bin"), plaintext).unwrap();
        fs::write(dir.path().join("PARAM.SFO"), sfo).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn plain(&self) -> PathBuf {
        self.path("plain.bin")
    }

    pub fn sfo(&self) -> PathBuf {
        self.path("PARAM.SFO")
    }

    pub fn container(&self) -> PathBuf {
        self.path("DATA.BIN")
    }

    pub fn decrypted(&self) -> PathBuf {
        self.path("decrypted.bin")
    }
}

fn put_u16(b: &mut [u8], at: usize, v: u16) {
    b[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(b: &mut [u8], at: usize, v: u32) {
    b[at..at + 4].copy_from_slice(&v.to_le_bytes());
}
