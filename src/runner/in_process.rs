//! Runner for tasks implemented in this process.
//!
//! Implementations satisfy [`ScraperTask`] and are registered by name in a
//! static table populated at process start. The runner looks the name up,
//! creates the task's output partition, and converts any error the
//! implementation returns into a `TaskFault` outcome.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use tracing::{info, instrument, warn};

use crate::error::TaskError;
use crate::models::{TaskDescriptor, TaskOutcome};
use crate::runner::TaskRunner;
use crate::scrapers::{self, ScraperTask};

/// Built-in task implementations, keyed by the name descriptors dispatch on.
static BUILTIN_TASKS: Lazy<HashMap<&'static str, Arc<dyn ScraperTask>>> = Lazy::new(|| {
    let mut tasks: HashMap<&'static str, Arc<dyn ScraperTask>> = HashMap::new();
    tasks.insert("example", Arc::new(scrapers::example::ExampleScraper));
    tasks.insert("news", Arc::new(scrapers::news::NewsScraper));
    tasks
});

pub struct InProcessRunner {
    tasks: HashMap<String, Arc<dyn ScraperTask>>,
}

impl InProcessRunner {
    /// Runner over the built-in task registry.
    pub fn new() -> Self {
        Self {
            tasks: BUILTIN_TASKS
                .iter()
                .map(|(name, task)| (name.to_string(), Arc::clone(task)))
                .collect(),
        }
    }

    /// Runner over an explicit registry. Used by tests and embedders.
    pub fn with_tasks(tasks: HashMap<String, Arc<dyn ScraperTask>>) -> Self {
        Self { tasks }
    }
}

impl Default for InProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for InProcessRunner {
    #[instrument(level = "info", skip_all, fields(task = %descriptor.id))]
    async fn execute(&self, descriptor: &TaskDescriptor) -> TaskOutcome {
        let started_at = Local::now();

        let Some(task) = self.tasks.get(&descriptor.name) else {
            warn!(name = %descriptor.name, "No registered implementation for task");
            return TaskOutcome::failed(
                descriptor,
                TaskError::unknown_task(&descriptor.name),
                started_at,
            );
        };

        // Scoped resource acquisition: the partition is created before the
        // task's first write, with no assumption about pre-existing state.
        if let Err(e) = descriptor.output_paths.create().await {
            return TaskOutcome::failed(
                descriptor,
                TaskError::fault(format!("failed to create output directories: {e}"), None),
                started_at,
            );
        }

        match task.run(&descriptor.config, &descriptor.output_paths).await {
            Ok(items) => {
                info!(items, "In-process task completed");
                TaskOutcome::success(descriptor, items, started_at)
            }
            Err(e) => {
                warn!(error = %e, "In-process task failed");
                TaskOutcome::failed(
                    descriptor,
                    TaskError::fault(e.to_string(), Some(format!("{e:?}"))),
                    started_at,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskErrorKind;
    use crate::models::{TaskKind, TaskStatus};
    use crate::paths::BatchPaths;
    use crate::scrapers::TaskResult;
    use std::collections::BTreeMap;
    use crate::paths::TaskPaths;

    struct FixedCount(u64);

    #[async_trait]
    impl ScraperTask for FixedCount {
        async fn run(
            &self,
            _config: &BTreeMap<String, serde_json::Value>,
            _paths: &TaskPaths,
        ) -> TaskResult {
            Ok(self.0)
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl ScraperTask for AlwaysFails {
        async fn run(
            &self,
            _config: &BTreeMap<String, serde_json::Value>,
            _paths: &TaskPaths,
        ) -> TaskResult {
            Err("selector did not match anything".into())
        }
    }

    fn descriptor_in(tmp: &std::path::Path, name: &str) -> TaskDescriptor {
        let batch = BatchPaths::new(tmp.join("out"));
        TaskDescriptor {
            id: name.to_string(),
            kind: TaskKind::InProcess,
            name: name.to_string(),
            config: BTreeMap::new(),
            output_paths: batch.task_paths(name),
        }
    }

    fn runner_with(name: &str, task: Arc<dyn ScraperTask>) -> InProcessRunner {
        let mut tasks: HashMap<String, Arc<dyn ScraperTask>> = HashMap::new();
        tasks.insert(name.to_string(), task);
        InProcessRunner::with_tasks(tasks)
    }

    #[tokio::test]
    async fn test_unknown_name_yields_unknown_task() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = InProcessRunner::with_tasks(HashMap::new());
        let outcome = runner.execute(&descriptor_in(tmp.path(), "ghost")).await;

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.error.unwrap().kind, TaskErrorKind::UnknownTask);
    }

    #[tokio::test]
    async fn test_successful_task_reports_item_count_and_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner_with("fixed", Arc::new(FixedCount(7)));
        let descriptor = descriptor_in(tmp.path(), "fixed");
        let outcome = runner.execute(&descriptor).await;

        assert_eq!(outcome.status, TaskStatus::Success);
        assert_eq!(outcome.items_processed, 7);
        assert!(descriptor.output_paths.data.is_dir());
        assert!(descriptor.output_paths.exports.is_dir());
    }

    #[tokio::test]
    async fn test_implementation_error_becomes_task_fault() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner_with("bad", Arc::new(AlwaysFails));
        let outcome = runner.execute(&descriptor_in(tmp.path(), "bad")).await;

        assert_eq!(outcome.status, TaskStatus::Failed);
        let err = outcome.error.unwrap();
        assert_eq!(err.kind, TaskErrorKind::TaskFault);
        assert!(err.message.contains("selector did not match"));
        assert!(err.trace.is_some());
    }

    #[test]
    fn test_builtin_registry_contains_bundled_scrapers() {
        let runner = InProcessRunner::new();
        assert!(runner.tasks.contains_key("example"));
        assert!(runner.tasks.contains_key("news"));
    }
}
