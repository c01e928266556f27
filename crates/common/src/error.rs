//! Error taxonomy shared by the codec, the metadata writer, and the facade.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse error family, recoverable from a signed error code by range.
///
/// Codes are `base - stage`, so a decrypt failure at stage 7 is `-107`:
///
/// | Category          | Base   | Range            |
/// |-------------------|--------|------------------|
/// | `FileIo`          | `-1`   | exactly `-1`     |
/// | `Memory`          | `-2`   | exactly `-2`     |
/// | `InvalidBlobSize` | `-3`   | exactly `-3`     |
/// | `Decrypt`         | `-100` | `-101 ..= -199`  |
/// | `Encrypt`         | `-200` | `-201 ..= -299`  |
/// | `Hash`            | `-300` | `-301 ..= -399`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    FileIo,
    Memory,
    InvalidBlobSize,
    Decrypt,
    Encrypt,
    Hash,
}

impl ErrorCategory {
    /// Base value the stage offset is subtracted from.
    pub fn base(self) -> i64 {
        match self {
            ErrorCategory::FileIo => -1,
            ErrorCategory::Memory => -2,
            ErrorCategory::InvalidBlobSize => -3,
            ErrorCategory::Decrypt => -100,
            ErrorCategory::Encrypt => -200,
            ErrorCategory::Hash => -300,
        }
    }

    /// Classify a signed code. Returns [`None`] for non-negative values and
    /// values outside every documented range.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(ErrorCategory::FileIo),
            -2 => Some(ErrorCategory::Memory),
            -3 => Some(ErrorCategory::InvalidBlobSize),
            -199..=-101 => Some(ErrorCategory::Decrypt),
            -299..=-201 => Some(ErrorCategory::Encrypt),
            -399..=-301 => Some(ErrorCategory::Hash),
            _ => None,
        }
    }
}

/// Engine stage at which a decrypt call failed, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptStage {
    /// The container is not longer than its 16-byte IV.
    InsufficientLength = 1,
    IndexSetupFailure = 2,
    ListCreationFailure = 3,
    IvConsumeFailure = 4,
    BodyTransformFailure = 5,
    DigestRegisterFailure = 6,
    /// Authentication check; tampered or wrong-key containers stop here.
    VerifyFailure = 7,
}

/// Engine stage at which an encrypt call failed, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptStage {
    ListCreationFailure = 1,
    IndexSetupFailure = 2,
    IvTransformFailure = 3,
    DigestRegisterFailure = 4,
    BodyTransformFailure = 5,
    VerifyFailure = 6,
    DigestExtractFailure = 7,
}

/// Failure while locating a digest slot inside the metadata blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStage {
    /// A header or index field points outside the blob.
    MalformedTable = 1,
    /// The blob has no filename-keyed digest table.
    FileListMissing = 2,
    /// No table entry matches the data filename.
    EntryNotFound = 3,
}

impl DecryptStage {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl EncryptStage {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl MetadataStage {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Top-level error returned by every savedata operation.
#[derive(Debug, Error)]
pub enum SavedataError {
    /// Open, read, write, or size failure on a file.
    #[error("file I/O failed for {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file that must carry data was empty.
    #[error("file is empty: {}", .0.display())]
    EmptyFile(PathBuf),

    /// A working buffer of the given size could not be allocated.
    #[error("could not allocate a {0}-byte buffer")]
    Memory(usize),

    /// The metadata blob is not exactly the fixed record size.
    #[error("metadata blob has invalid size {0}")]
    InvalidBlobSize(usize),

    #[error("decryption failed at stage {0:?}")]
    Decrypt(DecryptStage),

    #[error("encryption failed at stage {0:?}")]
    Encrypt(EncryptStage),

    #[error("metadata digest update failed at stage {0:?}")]
    Metadata(MetadataStage),
}

impl SavedataError {
    /// Shorthand for wrapping an [`std::io::Error`] with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SavedataError::FileIo {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SavedataError::FileIo { .. } | SavedataError::EmptyFile(_) => ErrorCategory::FileIo,
            SavedataError::Memory(_) => ErrorCategory::Memory,
            SavedataError::InvalidBlobSize(_) => ErrorCategory::InvalidBlobSize,
            SavedataError::Decrypt(_) => ErrorCategory::Decrypt,
            SavedataError::Encrypt(_) => ErrorCategory::Encrypt,
            SavedataError::Metadata(_) => ErrorCategory::Hash,
        }
    }

    /// The stage offset within the category, if the category has stages.
    pub fn stage_code(&self) -> Option<i64> {
        match self {
            SavedataError::Decrypt(s) => Some(s.code()),
            SavedataError::Encrypt(s) => Some(s.code()),
            SavedataError::Metadata(s) => Some(s.code()),
            _ => None,
        }
    }

    /// Signed legacy error code: category base minus stage offset.
    pub fn code(&self) -> i64 {
        self.category().base() - self.stage_code().unwrap_or(0)
    }
}

impl From<DecryptStage> for SavedataError {
    fn from(stage: DecryptStage) -> Self {
        SavedataError::Decrypt(stage)
    }
}

impl From<EncryptStage> for SavedataError {
    fn from(stage: EncryptStage) -> Self {
        SavedataError::Encrypt(stage)
    }
}

impl From<MetadataStage> for SavedataError {
    fn from(stage: MetadataStage) -> Self {
        SavedataError::Metadata(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_codes_follow_call_order() {
        assert_eq!(DecryptStage::InsufficientLength.code(), 1);
        assert_eq!(DecryptStage::VerifyFailure.code(), 7);
        assert_eq!(EncryptStage::ListCreationFailure.code(), 1);
        assert_eq!(EncryptStage::DigestExtractFailure.code(), 7);
        assert_eq!(MetadataStage::EntryNotFound.code(), 3);
    }

    #[test]
    fn codes_combine_base_and_stage() {
        assert_eq!(SavedataError::Decrypt(DecryptStage::VerifyFailure).code(), -107);
        assert_eq!(SavedataError::Encrypt(EncryptStage::IndexSetupFailure).code(), -202);
        assert_eq!(SavedataError::Metadata(MetadataStage::EntryNotFound).code(), -303);
        assert_eq!(SavedataError::InvalidBlobSize(10).code(), -3);
        assert_eq!(SavedataError::Memory(16).code(), -2);
        assert_eq!(SavedataError::EmptyFile("x".into()).code(), -1);
    }

    #[test]
    fn category_recovered_from_code() {
        for err in [
            SavedataError::Decrypt(DecryptStage::InsufficientLength),
            SavedataError::Encrypt(EncryptStage::VerifyFailure),
            SavedataError::Metadata(MetadataStage::MalformedTable),
            SavedataError::InvalidBlobSize(0),
            SavedataError::Memory(0),
            SavedataError::io("a", std::io::Error::from(std::io::ErrorKind::NotFound)),
        ] {
            assert_eq!(ErrorCategory::from_code(err.code()), Some(err.category()));
        }
        assert_eq!(ErrorCategory::from_code(0), None);
        assert_eq!(ErrorCategory::from_code(48), None);
        assert_eq!(ErrorCategory::from_code(-100), None);
    }

    #[test]
    fn display_names_the_stage_and_path() {
        let e = SavedataError::Decrypt(DecryptStage::VerifyFailure);
        assert!(e.to_string().contains("VerifyFailure"));

        let e = SavedataError::io(
            "/saves/DATA.BIN",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(e.to_string().contains("/saves/DATA.BIN"));
    }
}
