//! Whole-file reads and writes for the facade.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use common::SavedataError;
use uuid::Uuid;

/// Read a whole file that must not be empty.
///
/// # Errors
///
/// [`SavedataError::FileIo`] if the file cannot be read and
/// [`SavedataError::EmptyFile`] if it holds no bytes.
pub fn read_file(path: &Path) -> Result<Vec<u8>, SavedataError> {
    let bytes = read_bytes(path)?;
    if bytes.is_empty() {
        return Err(SavedataError::EmptyFile(path.to_path_buf()));
    }
    Ok(bytes)
}

/// Read a whole file, empty or not.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, SavedataError> {
    fs::read(path).map_err(|e| SavedataError::io(path, e))
}

/// Create or truncate `path` and write `bytes` to it.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SavedataError> {
    fs::write(path, bytes).map_err(|e| SavedataError::io(path, e))
}

/// Replace `path` with `bytes` via a synced sibling temp file and a rename,
/// so readers see either the old or the new contents.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), SavedataError> {
    let tmp_path = temp_path_for(path);

    let written = fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(SavedataError::io(&tmp_path, e));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(SavedataError::io(path, e));
    }
    Ok(())
}

/// Unique temp path next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let base_name = path
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("PARAM.SFO");
    path.with_file_name(format!(".{base_name}.{}.tmp", Uuid::new_v4()))
}
