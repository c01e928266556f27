//! Configuration loading and validation for the `savedata` binary.
//!
//! All values are read from `SED_`-prefixed environment variables at startup.
//! The process exits with a clear error message if any required variable is
//! missing or invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use common::protocol::KeyedGeneration;
use common::CipherKey;
use serde::Deserialize;

use crate::metadata::sfo::FILE_NAME_LEN;

/// Which facade operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
        }
    }
}

/// Validated binary configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// `encrypt` or `decrypt`. **Required.**
    pub operation: Operation,

    /// Plaintext (encrypt) or container (decrypt) to read. **Required.**
    pub input_path: PathBuf,

    /// Container (encrypt) or plaintext (decrypt) to write. **Required.**
    pub output_path: PathBuf,

    /// Metadata blob to update. **Required for encrypt.**
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,

    /// Filename the digest is recorded under in the metadata blob.
    #[serde(default = "default_data_filename")]
    pub data_filename: String,

    /// Game key as 32 hex characters. Absent means non-keyed mode.
    #[serde(default)]
    pub game_key: Option<String>,

    /// Software engine device key as 32 hex characters.
    #[serde(default)]
    pub device_key: Option<String>,

    /// Keyed algorithm generation used when a game key is present.
    #[serde(default)]
    pub keyed_generation: KeyedGeneration,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("operation", &self.operation)
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("metadata_path", &self.metadata_path)
            .field("data_filename", &self.data_filename)
            .field("game_key", &self.game_key.as_ref().map(|_| "[REDACTED]"))
            .field("device_key", &self.device_key.as_ref().map(|_| "[REDACTED]"))
            .field("keyed_generation", &self.keyed_generation)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn default_data_filename() -> String {
    "DATA.BIN".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix("SED"))
    }

    fn load(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty_path(&self.input_path, "SED_INPUT_PATH")?;
        ensure_non_empty_path(&self.output_path, "SED_OUTPUT_PATH")?;

        if self.operation == Operation::Encrypt {
            match &self.metadata_path {
                Some(p) => ensure_non_empty_path(p, "SED_METADATA_PATH")?,
                None => anyhow::bail!("SED_METADATA_PATH is required for encrypt"),
            }
        }

        if self.data_filename.is_empty() || self.data_filename.len() > FILE_NAME_LEN {
            anyhow::bail!("SED_DATA_FILENAME must be 1 to {FILE_NAME_LEN} bytes");
        }

        self.game_key()?;
        self.device_key()?;
        Ok(())
    }

    /// The parsed game key, if one is configured.
    pub fn game_key(&self) -> Result<Option<CipherKey>> {
        parse_key(self.game_key.as_deref(), "SED_GAME_KEY")
    }

    /// The parsed software engine device key, if one is configured.
    pub fn device_key(&self) -> Result<Option<CipherKey>> {
        parse_key(self.device_key.as_deref(), "SED_DEVICE_KEY")
    }
}

fn parse_key(value: Option<&str>, name: &str) -> Result<Option<CipherKey>> {
    value
        .map(|s| CipherKey::from_hex(s).with_context(|| format!("{name} is not a valid key")))
        .transpose()
}

fn ensure_non_empty_path(value: &std::path::Path, name: &str) -> Result<()> {
    if value.as_os_str().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
