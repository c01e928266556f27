//! Savedata container framing on top of a staged crypto engine.
//!
//! The crate converts save files between plaintext and the IV-prefixed
//! encrypted container, and keeps the filename-keyed digests of the
//! accompanying metadata blob in step with the container it describes.
//!
//! # Layering
//!
//! | Module       | Role |
//! |--------------|------|
//! | [`align`]    | 16-byte size rounding |
//! | [`buffer`]   | Owned container buffer with IV headroom |
//! | [`engine`]   | Staged engine capability and its software emulation |
//! | [`codec`]    | Ordered engine calls for each direction |
//! | [`metadata`] | Fixed-size metadata blob and digest slot lookup |
//! | [`facade`]   | File-level `encrypt` / `decrypt` facade |
//! | [`fsio`]     | Whole-file reads, atomic blob replacement |
//!
//! [`config`] and [`telemetry`] serve the `savedata` binary.
//!
//! # Module invariants
//!
//! - Key material and plaintext never reach a log field.
//! - Engine contexts live on the stack of a single codec call.

pub mod align;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod engine;
pub mod facade;
pub mod fsio;
pub mod metadata;
pub mod telemetry;

pub use common::{CipherKey, Digest, SavedataError};
pub use engine::{soft::SoftEngine, CryptoEngine, EngineError};
pub use facade::Savedata;
pub use metadata::MetadataBlob;
