//! Data model for the batch: task identities, per-task outcomes, and the
//! aggregated report.
//!
//! The core types are:
//! - [`TaskDescriptor`]: the immutable identity of one unit of scraping work
//! - [`TaskOutcome`]: the terminal result of executing one descriptor
//! - [`BatchStats`]: the running counters shared by all workers
//! - [`Report`]: the immutable snapshot written at batch end
//!
//! Descriptors are built once from configuration and never mutated after the
//! batch starts. An outcome is produced by exactly one runner invocation and
//! handed to the aggregator, which owns it from then on.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskErrorKind};
use crate::paths::TaskPaths;

/// How a task is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// A Rust implementation registered in this process.
    InProcess,
    /// A subprocess in another runtime, driven through the file handoff
    /// contract (config in, result file out, exit code as the signal).
    ExternalProcess,
}

/// The immutable identity of one scraping task within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Unique within the batch; duplicate ids are a configuration error.
    pub id: String,
    pub kind: TaskKind,
    /// Implementation (or script) name the runner dispatches on.
    pub name: String,
    /// Opaque task-specific configuration, passed through untouched.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    /// The directories this task may write to.
    pub output_paths: TaskPaths,
}

/// Terminal status of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// The terminal result of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub name: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub items_processed: u64,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskOutcome {
    pub fn success(descriptor: &TaskDescriptor, items: u64, started_at: DateTime<Local>) -> Self {
        Self {
            task_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            status: TaskStatus::Success,
            items_processed: items,
            started_at,
            ended_at: Local::now(),
            error: None,
        }
    }

    pub fn failed(descriptor: &TaskDescriptor, error: TaskError, started_at: DateTime<Local>) -> Self {
        Self {
            task_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            status: TaskStatus::Failed,
            items_processed: 0,
            started_at,
            ended_at: Local::now(),
            error: Some(error),
        }
    }
}

/// One entry in the report's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchErrorEntry {
    pub task: String,
    pub kind: TaskErrorKind,
    pub error: String,
}

/// The running batch-wide counters. A single instance is shared by all
/// workers and mutated only through the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub tasks_submitted: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub items_total: u64,
    /// Failures in completion order.
    pub errors: Vec<BatchErrorEntry>,
}

/// Headline figures for the report artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_seconds: f64,
    pub tasks_submitted: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub items_total: u64,
    pub output_directory: String,
}

/// The immutable snapshot produced exactly once at batch end.
///
/// `scraper_details` preserves submission order regardless of the order in
/// which tasks actually completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub errors: Vec<BatchErrorEntry>,
    pub scraper_details: Vec<TaskOutcome>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn descriptor(id: &str, kind: TaskKind) -> TaskDescriptor {
        TaskDescriptor {
            id: id.to_string(),
            kind,
            name: id.to_string(),
            config: BTreeMap::new(),
            output_paths: TaskPaths {
                data: PathBuf::from(format!("/tmp/out/data/{id}")),
                exports: PathBuf::from(format!("/tmp/out/exports/{id}")),
                schemas: PathBuf::from(format!("/tmp/out/schemas/{id}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::descriptor;
    use super::*;

    #[test]
    fn test_task_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TaskKind::ExternalProcess).unwrap();
        assert_eq!(json, r#""external_process""#);
    }

    #[test]
    fn test_success_outcome_carries_no_error() {
        let d = descriptor("a", TaskKind::InProcess);
        let outcome = TaskOutcome::success(&d, 5, Local::now());

        assert_eq!(outcome.status, TaskStatus::Success);
        assert_eq!(outcome.items_processed, 5);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"success\""));
    }

    #[test]
    fn test_failed_outcome_has_zero_items_and_an_error() {
        let d = descriptor("b", TaskKind::ExternalProcess);
        let outcome = TaskOutcome::failed(
            &d,
            TaskError::process_failure("exited with code 2", Some("boom".into())),
            Local::now(),
        );

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.items_processed, 0);
        assert_eq!(
            outcome.error.as_ref().unwrap().kind,
            TaskErrorKind::ProcessFailure
        );
    }

    #[test]
    fn test_descriptor_round_trips_through_json() {
        let mut d = descriptor("news", TaskKind::InProcess);
        d.config
            .insert("url".into(), serde_json::json!("https://example.com"));

        let json = serde_json::to_string(&d).unwrap();
        let back: TaskDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "news");
        assert_eq!(back.config["url"], serde_json::json!("https://example.com"));
        assert_eq!(back.output_paths, d.output_paths);
    }
}
