//! Common types, container constants, and errors shared across the savedata crates.

pub mod error;
pub mod protocol;

pub use error::{DecryptStage, EncryptStage, ErrorCategory, MetadataStage, SavedataError};
pub use protocol::{CipherKey, Digest, Direction, KeyedGeneration, Mode};
