//! `savedata` binary entry point.
//!
//! Runs one operation per invocation:
//! 1. Load and validate [`Config`] from `SED_*` environment variables.
//! 2. Initialise structured logging.
//! 3. Build the software engine and the facade.
//! 4. Run the configured operation.
//! 5. Print an [`OperationReport`] to stdout and exit non-zero on failure.

use anyhow::{Context, Result};
use common::protocol::OperationReport;
use tracing::{error, info};

use savedata::config::{Config, Operation};
use savedata::engine::soft::SoftEngine;
use savedata::{telemetry, Savedata, SavedataError};

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        operation = cfg.operation.as_str(),
        "savedata starting"
    );

    // -----------------------------------------------------------------------
    // 3. Engine and facade
    // -----------------------------------------------------------------------
    let engine = match cfg.device_key()? {
        Some(device_key) => SoftEngine::new(device_key),
        None => SoftEngine::default(),
    };
    let facade = Savedata::new(engine).with_keyed_generation(cfg.keyed_generation);
    let game_key = cfg.game_key()?;

    // -----------------------------------------------------------------------
    // 4. Operation
    // -----------------------------------------------------------------------
    let result = match cfg.operation {
        Operation::Encrypt => {
            let metadata = cfg
                .metadata_path
                .as_deref()
                .context("SED_METADATA_PATH is required for encrypt")?;
            facade.encrypt(
                &cfg.input_path,
                &cfg.output_path,
                &cfg.data_filename,
                metadata,
                game_key.as_ref(),
            )
        }
        Operation::Decrypt => {
            facade.decrypt(&cfg.output_path, &cfg.input_path, game_key.as_ref())
        }
    };

    // -----------------------------------------------------------------------
    // 5. Report
    // -----------------------------------------------------------------------
    let failed = result.is_err();
    let report = report(cfg.operation, result);
    println!(
        "{}",
        serde_json::to_string(&report).context("failed to serialise report")?
    );

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn report(operation: Operation, result: Result<u64, SavedataError>) -> OperationReport {
    match result {
        Ok(bytes) => {
            info!(bytes, "operation complete");
            OperationReport::success(operation.as_str(), bytes)
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "operation failed");
            OperationReport::failure(operation.as_str(), e.code(), e.to_string())
        }
    }
}
