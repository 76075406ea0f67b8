//! Runner for tasks that execute as subprocesses in another runtime.
//!
//! The handoff is an explicit message-passing contract across the runtime
//! boundary:
//!
//! 1. The descriptor's config is serialized to
//!    `schemas/<task>/config.json`.
//! 2. The subprocess is invoked as
//!    `<runtime> <scripts_dir>/<name>.<ext> --config <file> --output <batch-root>`.
//! 3. The exit code is the authoritative success signal.
//! 4. On success the subprocess may leave `data/<task>/result.json`
//!    (`{ "items_scraped": n }`) behind; it is best-effort and only feeds
//!    item counting. stdout/stderr are captured for diagnostics only.
//!
//! Children are spawned with `kill_on_drop`, so when the batch deadline
//! drops this runner's future the subprocess is terminated rather than left
//! running past the batch.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::ExternalConfig;
use crate::error::TaskError;
use crate::models::{TaskDescriptor, TaskOutcome};
use crate::paths::BatchPaths;
use crate::runner::TaskRunner;
use crate::utils::truncate_for_log;

/// Cap on the stderr excerpt carried in a `ProcessFailure` payload.
const STDERR_EXCERPT_BYTES: usize = 2048;

/// Best-effort result file left by the subprocess in its data directory.
#[derive(Debug, Deserialize)]
struct ResultFile {
    #[serde(default)]
    items_scraped: u64,
}

pub struct ExternalProcessRunner {
    batch: BatchPaths,
    runtime: String,
    scripts_dir: PathBuf,
    extension: String,
}

impl ExternalProcessRunner {
    pub fn new(batch: BatchPaths, config: &ExternalConfig) -> Self {
        Self {
            batch,
            runtime: config.runtime.clone(),
            scripts_dir: config.scripts_dir.clone(),
            extension: config.extension.clone(),
        }
    }

    fn script_path(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(format!("{name}.{}", self.extension))
    }

    /// Serialize the task's config for the subprocess to read.
    async fn write_config(&self, descriptor: &TaskDescriptor) -> Result<PathBuf, TaskError> {
        let path = self.batch.task_config_file(&descriptor.name);
        let rendered = serde_json::to_vec_pretty(&descriptor.config)
            .map_err(|e| TaskError::fault(format!("failed to serialize task config: {e}"), None))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskError::fault(format!("failed to create config dir: {e}"), None))?;
        }
        fs::write(&path, rendered)
            .await
            .map_err(|e| TaskError::fault(format!("failed to write task config: {e}"), None))?;
        Ok(path)
    }

    /// Read the conventional result file; missing or unparsable files count
    /// as zero items, the outcome stays a success.
    async fn read_item_count(&self, name: &str) -> u64 {
        let path = self.batch.result_file(name);
        match fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<ResultFile>(&raw) {
                Ok(result) => result.items_scraped,
                Err(e) => {
                    warn!(task = name, path = %path.display(), error = %e, "Unparsable result file; counting 0 items");
                    0
                }
            },
            Err(_) => {
                debug!(task = name, path = %path.display(), "No result file; counting 0 items");
                0
            }
        }
    }
}

#[async_trait]
impl TaskRunner for ExternalProcessRunner {
    #[instrument(level = "info", skip_all, fields(task = %descriptor.id, runtime = %self.runtime))]
    async fn execute(&self, descriptor: &TaskDescriptor) -> TaskOutcome {
        let started_at = Local::now();

        let config_path = match self.write_config(descriptor).await {
            Ok(path) => path,
            Err(err) => return TaskOutcome::failed(descriptor, err, started_at),
        };
        if let Err(e) = descriptor.output_paths.create().await {
            return TaskOutcome::failed(
                descriptor,
                TaskError::fault(format!("failed to create output directories: {e}"), None),
                started_at,
            );
        }

        let script = self.script_path(&descriptor.name);
        info!(script = %script.display(), "Spawning external task process");

        let output = Command::new(&self.runtime)
            .arg(&script)
            .arg("--config")
            .arg(&config_path)
            .arg("--output")
            .arg(&self.batch.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Failed to spawn external task process");
                return TaskOutcome::failed(
                    descriptor,
                    TaskError::process_failure(
                        format!("failed to spawn '{}': {e}", self.runtime),
                        None,
                    ),
                    started_at,
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            debug!(stdout = %truncate_for_log(&stdout, STDERR_EXCERPT_BYTES), "External task stdout");
        }
        if !stderr.is_empty() {
            debug!(stderr = %truncate_for_log(&stderr, STDERR_EXCERPT_BYTES), "External task stderr");
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(exit_code = code, "External task process failed");
            let excerpt = (!stderr.is_empty())
                .then(|| truncate_for_log(stderr.trim_end(), STDERR_EXCERPT_BYTES));
            return TaskOutcome::failed(
                descriptor,
                TaskError::process_failure(format!("process exited with code {code}"), excerpt),
                started_at,
            );
        }

        let items = self.read_item_count(&descriptor.name).await;
        info!(items, "External task completed");
        TaskOutcome::success(descriptor, items, started_at)
    }
}
