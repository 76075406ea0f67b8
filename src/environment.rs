//! Startup environment checks.
//!
//! Before the batch starts (and before any output directory is created) the
//! external runtime is probed with `--version`. A missing or broken runtime
//! is a fatal [`FatalError::Environment`]; a config with no external tasks
//! skips the probe entirely.

use tokio::process::Command;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::FatalError;
use crate::utils::truncate_for_log;

#[instrument(level = "info", skip_all)]
pub async fn check_environment(config: &Config) -> Result<(), FatalError> {
    if config.scrapers.external_process.is_empty() {
        info!("No external tasks configured; skipping runtime check");
        return Ok(());
    }

    let runtime = &config.external.runtime;
    let output = Command::new(runtime)
        .arg("--version")
        .output()
        .await
        .map_err(|e| {
            FatalError::Environment(format!("external runtime '{runtime}' not found: {e}"))
        })?;

    if !output.status.success() {
        return Err(FatalError::Environment(format!(
            "external runtime '{runtime}' failed its version check (exit code {})",
            output.status.code().unwrap_or(-1)
        )));
    }

    let version = String::from_utf8_lossy(&output.stdout);
    info!(runtime = %runtime, version = %truncate_for_log(version.trim(), 80), "External runtime OK");
    Ok(())
}
