//! Error taxonomy for the orchestrator.
//!
//! Two families of errors exist and they never mix:
//!
//! - [`FatalError`]: startup failures (bad configuration, missing runtime)
//!   that prevent the batch from running at all. These propagate out of
//!   `main` and set a non-zero exit status.
//! - [`TaskError`]: anything that goes wrong inside a single task's
//!   execution. These are captured at the runner boundary, folded into a
//!   `Failed` outcome, and surface only through the batch report. A batch in
//!   which every task fails still exits successfully.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort the batch before any task starts.
#[derive(Debug, Error)]
pub enum FatalError {
    /// Malformed or contradictory configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required runtime or dependency is missing from the environment.
    #[error("environment error: {0}")]
    Environment(String),
}

/// Classification of per-task failures, as reported in the batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskErrorKind {
    /// No implementation is registered under the descriptor's name.
    UnknownTask,
    /// The task implementation returned an error or panicked.
    TaskFault,
    /// The external subprocess could not be spawned or exited non-zero.
    ProcessFailure,
    /// The task was still outstanding when the batch deadline expired.
    Timeout,
}

/// A structured per-task error carried inside a `Failed` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind:?}: {message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    /// Optional diagnostic payload: a backtrace-ish debug rendering for
    /// faults, a stderr excerpt for process failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl TaskError {
    pub fn unknown_task(name: &str) -> Self {
        Self {
            kind: TaskErrorKind::UnknownTask,
            message: format!("no task implementation registered under '{name}'"),
            trace: None,
        }
    }

    pub fn fault(message: impl Into<String>, trace: Option<String>) -> Self {
        Self {
            kind: TaskErrorKind::TaskFault,
            message: message.into(),
            trace,
        }
    }

    pub fn process_failure(message: impl Into<String>, stderr_excerpt: Option<String>) -> Self {
        Self {
            kind: TaskErrorKind::ProcessFailure,
            message: message.into(),
            trace: stderr_excerpt,
        }
    }

    pub fn timeout(deadline: Duration) -> Self {
        Self {
            kind: TaskErrorKind::Timeout,
            message: format!("task still outstanding when the {deadline:?} batch deadline expired"),
            trace: None,
        }
    }
}
