//! Batch configuration loading and descriptor construction.
//!
//! Configuration is a YAML file:
//!
//! ```yaml
//! parallelism:
//!   max_workers: 4
//!   timeout: 300          # seconds, bounds the whole batch
//! scrapers:
//!   in_process: [example]
//!   external_process: [news]
//! external:
//!   runtime: node         # binary used to launch external scripts
//!   scripts_dir: scrapers
//!   extension: js
//! targets:
//!   example:
//!     url: https://example.com
//!     selectors:
//!       title: h1
//! ```
//!
//! A missing config file is not an error: the default configuration is
//! written to the requested path and used. A *malformed* file is a fatal
//! [`FatalError::Config`]; it is never silently replaced with defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::error::FatalError;
use crate::models::{TaskDescriptor, TaskKind};
use crate::paths::BatchPaths;

/// Top-level configuration for one orchestrator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parallelism: Parallelism,
    pub scrapers: ScraperLists,
    pub external: ExternalConfig,
    /// Per-task opaque configuration, keyed by task name. Passed through to
    /// the task implementation (or serialized to file for subprocesses).
    pub targets: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

/// Concurrency budget and batch deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Parallelism {
    pub max_workers: usize,
    /// Wall-clock bound, in seconds, on waiting for the entire batch.
    pub timeout: u64,
}

impl Default for Parallelism {
    fn default() -> Self {
        Self {
            max_workers: 4,
            timeout: 300,
        }
    }
}

/// Which tasks to run, by execution kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperLists {
    pub in_process: Vec<String>,
    pub external_process: Vec<String>,
}

/// How external-process tasks are launched.
///
/// The invocation contract is fixed:
/// `<runtime> <scripts_dir>/<name>.<extension> --config <file> --output <batch-root>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    pub runtime: String,
    pub scripts_dir: PathBuf,
    pub extension: String,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            runtime: "node".to_string(),
            scripts_dir: PathBuf::from("scrapers"),
            extension: "js".to_string(),
        }
    }
}

/// Load configuration from `path`, writing and using the defaults when the
/// file does not exist.
pub async fn load_config(path: &Path) -> Result<Config, FatalError> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found; writing default config");
        let config = Config::default();
        let rendered = serde_yaml::to_string(&config)
            .map_err(|e| FatalError::Config(format!("failed to render default config: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FatalError::Config(format!("failed to create config dir: {e}")))?;
            }
        }
        fs::write(path, rendered)
            .await
            .map_err(|e| FatalError::Config(format!("failed to write default config: {e}")))?;
        return Ok(config);
    }

    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| FatalError::Config(format!("failed to read {}: {e}", path.display())))?;
    let config: Config = serde_yaml::from_str(&raw)
        .map_err(|e| FatalError::Config(format!("malformed config {}: {e}", path.display())))?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Build the immutable descriptor registry for one batch.
///
/// Task id is the task name; a name listed under both kinds therefore
/// produces duplicate ids, which the scheduler rejects before any task
/// starts.
pub fn build_descriptors(config: &Config, batch: &BatchPaths) -> Vec<TaskDescriptor> {
    let mut descriptors = Vec::new();
    for (names, kind) in [
        (&config.scrapers.in_process, TaskKind::InProcess),
        (&config.scrapers.external_process, TaskKind::ExternalProcess),
    ] {
        for name in names {
            descriptors.push(TaskDescriptor {
                id: name.clone(),
                kind,
                name: name.clone(),
                config: config.targets.get(name).cloned().unwrap_or_default(),
                output_paths: batch.task_paths(name),
            });
        }
    }
    descriptors
}
