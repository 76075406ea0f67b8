//! Batch scheduling: bounded fan-out, single batch deadline, failure
//! isolation.
//!
//! `run_batch` submits every descriptor to a pool of `max_workers`
//! concurrent execution slots. Tasks start in submission order as slots free
//! up; completion order is unconstrained. Each execution is wrapped in its
//! own spawned task, so a panicking implementation becomes a `TaskFault`
//! outcome instead of tearing down the batch.
//!
//! One wall-clock deadline bounds waiting for the whole batch, not each
//! task. On expiry the scheduler stops waiting, the in-flight execution
//! futures are dropped (aborting their tasks and killing spawned
//! subprocesses via `kill_on_drop`), and every unrecorded task is backfilled
//! as `Failed`/`Timeout`. The returned report is always complete:
//! `tasks_submitted == descriptors.len()` no matter what failed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::stream::{self, StreamExt};
use tokio_util::task::AbortOnDropHandle;
use tracing::{info, instrument, warn};

use crate::aggregator::ResultAggregator;
use crate::config::ExternalConfig;
use crate::error::{FatalError, TaskError};
use crate::models::{Report, ReportSummary, TaskDescriptor, TaskKind, TaskOutcome};
use crate::paths::BatchPaths;
use crate::runner::external::ExternalProcessRunner;
use crate::runner::in_process::InProcessRunner;
use crate::runner::TaskRunner;

pub struct Scheduler {
    paths: BatchPaths,
    in_process: Arc<dyn TaskRunner>,
    external: Arc<dyn TaskRunner>,
}

impl Scheduler {
    pub fn new(paths: BatchPaths, external_config: &ExternalConfig) -> Self {
        let external = ExternalProcessRunner::new(paths.clone(), external_config);
        Self {
            in_process: Arc::new(InProcessRunner::new()),
            external: Arc::new(external),
            paths,
        }
    }

    /// Scheduler with explicit runners. Test seam.
    pub fn with_runners(
        paths: BatchPaths,
        in_process: Arc<dyn TaskRunner>,
        external: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            paths,
            in_process,
            external,
        }
    }

    fn runner_for(&self, kind: TaskKind) -> Arc<dyn TaskRunner> {
        match kind {
            TaskKind::InProcess => Arc::clone(&self.in_process),
            TaskKind::ExternalProcess => Arc::clone(&self.external),
        }
    }

    /// Run every descriptor under the concurrency budget and batch deadline,
    /// returning the complete report.
    ///
    /// Fails fast with a `ConfigError` on duplicate ids, a zero worker
    /// budget, or a zero deadline; nothing is started and no output
    /// directory is created in that case.
    #[instrument(level = "info", skip_all, fields(tasks = descriptors.len(), max_workers))]
    pub async fn run_batch(
        &self,
        descriptors: Vec<TaskDescriptor>,
        max_workers: usize,
        deadline: Duration,
    ) -> Result<Report, FatalError> {
        validate(&descriptors, max_workers, deadline)?;
        self.paths.create().await.map_err(|e| {
            FatalError::Environment(format!(
                "failed to create output directories under {}: {e}",
                self.paths.root.display()
            ))
        })?;

        let batch_started = Local::now();
        let submission_order: Vec<String> = descriptors.iter().map(|d| d.id.clone()).collect();
        let aggregator = Arc::new(ResultAggregator::new(descriptors.len() as u64));

        info!(
            deadline_secs = deadline.as_secs(),
            "Starting batch dispatch"
        );

        let dispatch = stream::iter(descriptors.clone())
            .map(|descriptor| {
                let runner = self.runner_for(descriptor.kind);
                let aggregator = Arc::clone(&aggregator);
                async move {
                    let outcome = execute_isolated(runner, descriptor).await;
                    aggregator.record(outcome);
                }
            })
            .buffer_unordered(max_workers)
            .collect::<Vec<()>>();

        if tokio::time::timeout(deadline, dispatch).await.is_err() {
            warn!(
                deadline_secs = deadline.as_secs(),
                "Batch deadline expired with tasks still outstanding"
            );
            for descriptor in &descriptors {
                if !aggregator.is_recorded(&descriptor.id) {
                    aggregator.record(TaskOutcome::failed(
                        descriptor,
                        TaskError::timeout(deadline),
                        batch_started,
                    ));
                }
            }
        }

        let batch_ended = Local::now();
        let stats = aggregator.snapshot();
        let scraper_details = aggregator.details_in(&submission_order);
        info!(
            succeeded = stats.tasks_succeeded,
            failed = stats.tasks_failed,
            items = stats.items_total,
            "Batch finished"
        );

        Ok(Report {
            summary: ReportSummary {
                start_time: batch_started,
                end_time: batch_ended,
                duration_seconds: (batch_ended - batch_started).num_milliseconds() as f64
                    / 1000.0,
                tasks_submitted: stats.tasks_submitted,
                tasks_succeeded: stats.tasks_succeeded,
                tasks_failed: stats.tasks_failed,
                items_total: stats.items_total,
                output_directory: self.paths.root.display().to_string(),
            },
            errors: stats.errors,
            scraper_details,
        })
    }
}

fn validate(
    descriptors: &[TaskDescriptor],
    max_workers: usize,
    deadline: Duration,
) -> Result<(), FatalError> {
    if max_workers == 0 {
        return Err(FatalError::Config("max_workers must be at least 1".into()));
    }
    if deadline.is_zero() {
        return Err(FatalError::Config("timeout must be greater than 0".into()));
    }
    let mut seen = HashSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.id.as_str()) {
            return Err(FatalError::Config(format!(
                "duplicate task id '{}'",
                descriptor.id
            )));
        }
    }
    Ok(())
}

/// Execute one descriptor in its own spawned task so that a panic inside
/// the runner or the task implementation is captured as a `TaskFault`
/// outcome instead of unwinding into the dispatch loop.
///
/// The spawned task is aborted if this future is dropped (deadline expiry),
/// which in turn drops any child process handle it owns.
async fn execute_isolated(runner: Arc<dyn TaskRunner>, descriptor: TaskDescriptor) -> TaskOutcome {
    let started_at = Local::now();
    let spawned = {
        let descriptor = descriptor.clone();
        AbortOnDropHandle::new(tokio::spawn(
            async move { runner.execute(&descriptor).await },
        ))
    };

    match spawned.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = if e.is_panic() {
                match e.into_panic().downcast::<String>() {
                    Ok(s) => format!("task panicked: {s}"),
                    Err(payload) => match payload.downcast::<&'static str>() {
                        Ok(s) => format!("task panicked: {s}"),
                        Err(_) => "task panicked".to_string(),
                    },
                }
            } else {
                "task execution was cancelled".to_string()
            };
            warn!(task = %descriptor.id, %message, "Task execution fault");
            TaskOutcome::failed(&descriptor, TaskError::fault(message, None), started_at)
        }
    }
}
