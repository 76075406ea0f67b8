//! Thread-safe accumulation of task outcomes into batch-wide statistics.
//!
//! `BatchStats` is the only state mutated by multiple workers; every
//! mutation goes through [`ResultAggregator::record`]. The critical section
//! is a plain mutex over in-memory counters and never touches I/O.
//!
//! Outcomes are buffered keyed by task id so the final report can list them
//! in submission order no matter which order tasks completed in.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, error};

use crate::models::{BatchErrorEntry, BatchStats, TaskOutcome, TaskStatus};

pub struct ResultAggregator {
    inner: Mutex<Inner>,
}

struct Inner {
    stats: BatchStats,
    outcomes: HashMap<String, TaskOutcome>,
}

impl ResultAggregator {
    pub fn new(tasks_submitted: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                stats: BatchStats {
                    tasks_submitted,
                    ..BatchStats::default()
                },
                outcomes: HashMap::new(),
            }),
        }
    }

    /// Record one task's outcome. Called exactly once per completed task;
    /// safe to call concurrently from any worker.
    ///
    /// A second outcome for the same task id is an aggregation contract
    /// violation: it is logged loudly and dropped rather than corrupting the
    /// counters.
    pub fn record(&self, outcome: TaskOutcome) {
        let mut inner = self.inner.lock().expect("aggregator mutex poisoned");
        if inner.outcomes.contains_key(&outcome.task_id) {
            error!(
                task_id = %outcome.task_id,
                "aggregation contract violation: duplicate outcome recorded for task; dropping"
            );
            return;
        }

        match outcome.status {
            TaskStatus::Success => {
                inner.stats.tasks_succeeded += 1;
                inner.stats.items_total += outcome.items_processed;
            }
            TaskStatus::Failed => {
                inner.stats.tasks_failed += 1;
                if let Some(ref err) = outcome.error {
                    inner.stats.errors.push(BatchErrorEntry {
                        task: outcome.task_id.clone(),
                        kind: err.kind,
                        error: err.message.clone(),
                    });
                }
            }
        }
        debug!(task_id = %outcome.task_id, status = ?outcome.status, "Recorded task outcome");
        inner.outcomes.insert(outcome.task_id.clone(), outcome);
    }

    /// Whether an outcome has already been recorded for `task_id`. Used by
    /// the scheduler to backfill `Timeout` outcomes on deadline expiry.
    pub fn is_recorded(&self, task_id: &str) -> bool {
        let inner = self.inner.lock().expect("aggregator mutex poisoned");
        inner.outcomes.contains_key(task_id)
    }

    /// An immutable copy of the current statistics. May be called while
    /// tasks are still in flight.
    pub fn snapshot(&self) -> BatchStats {
        let inner = self.inner.lock().expect("aggregator mutex poisoned");
        inner.stats.clone()
    }

    /// Buffered outcomes in the order given by `submission_order`.
    pub fn details_in(&self, submission_order: &[String]) -> Vec<TaskOutcome> {
        let inner = self.inner.lock().expect("aggregator mutex poisoned");
        submission_order
            .iter()
            .filter_map(|id| inner.outcomes.get(id).cloned())
            .collect()
    }
}
