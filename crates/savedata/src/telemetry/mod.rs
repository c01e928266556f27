//! Structured logging for the `savedata` binary.
//!
//! # Telemetry invariants
//!
//! - **No key material or plaintext** may appear in any log field.
//! - Log level is configurable via `SED_LOG_LEVEL` (default: `info`), and
//!   `RUST_LOG` overrides it when set.
//! - Logs go to stderr so stdout carries only the operation report.

pub mod init;

pub use init::init_telemetry;
