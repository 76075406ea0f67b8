//! In-process scraping task implementations.
//!
//! Each implementation satisfies [`ScraperTask`]: it receives its opaque
//! configuration and its output partition, does its work, and returns the
//! number of items it scraped. Errors bubble up to the in-process runner,
//! which converts them into `TaskFault` outcomes; implementations never
//! need to worry about the batch.
//!
//! Implementations are registered by name in the runner's static table
//! (`runner::in_process`), which is how descriptors find them.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::paths::TaskPaths;

pub mod example;
pub mod news;

/// What a task implementation returns: an item count, or whatever went
/// wrong.
pub type TaskResult = Result<u64, Box<dyn std::error::Error + Send + Sync>>;

/// One unit of in-process scraping work.
#[async_trait]
pub trait ScraperTask: Send + Sync {
    async fn run(
        &self,
        config: &BTreeMap<String, serde_json::Value>,
        paths: &TaskPaths,
    ) -> TaskResult;
}
