//! Output directory layout for a single batch.
//!
//! Every batch writes under one timestamped root:
//!
//! ```text
//! scraper_output_20250506_083000/
//! ├── data/<task>/        # scraped items, result.json handoff
//! ├── exports/<task>/     # alternate export formats
//! ├── logs/
//! ├── reports/            # scraping_report.json / .html
//! └── schemas/<task>/     # item schemas, serialized task config
//! ```
//!
//! Tasks are partitioned by name under `data/`, `exports/`, and `schemas/`,
//! so no two tasks ever contend on the same file.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Prefix for the timestamped batch root directory.
pub const OUTPUT_DIR_PREFIX: &str = "scraper_output";

/// Subdirectories created under the batch root before any task starts.
pub const OUTPUT_SUBDIRS: [&str; 5] = ["data", "exports", "logs", "reports", "schemas"];

/// The output root of one batch and the conventional paths beneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPaths {
    pub root: PathBuf,
}

impl BatchPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Batch root named after the batch start timestamp, e.g.
    /// `<parent>/scraper_output_20250506_083000`.
    pub fn timestamped(parent: &Path, timestamp: &str) -> Self {
        Self::new(parent.join(format!("{OUTPUT_DIR_PREFIX}_{timestamp}")))
    }

    /// Create the root and all fixed subdirectories.
    pub async fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        for subdir in OUTPUT_SUBDIRS {
            fs::create_dir_all(self.root.join(subdir)).await?;
        }
        info!(root = %self.root.display(), "Created output directory structure");
        Ok(())
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn report_json(&self) -> PathBuf {
        self.reports_dir().join("scraping_report.json")
    }

    pub fn report_html(&self) -> PathBuf {
        self.reports_dir().join("scraping_report.html")
    }

    /// Where an external task's serialized config is written before spawn.
    pub fn task_config_file(&self, task_name: &str) -> PathBuf {
        self.root.join("schemas").join(task_name).join("config.json")
    }

    /// Where an external task is expected to leave its best-effort result
    /// file (`{ "items_scraped": n }`).
    pub fn result_file(&self, task_name: &str) -> PathBuf {
        self.root.join("data").join(task_name).join("result.json")
    }

    /// The per-task output partition.
    pub fn task_paths(&self, task_name: &str) -> TaskPaths {
        TaskPaths {
            data: self.root.join("data").join(task_name),
            exports: self.root.join("exports").join(task_name),
            schemas: self.root.join("schemas").join(task_name),
        }
    }
}

/// The directories one task may write to. Each task writes only under its
/// own subtree; runners create these before the task's first write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPaths {
    pub data: PathBuf,
    pub exports: PathBuf,
    pub schemas: PathBuf,
}

impl TaskPaths {
    pub async fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.data).await?;
        fs::create_dir_all(&self.exports).await?;
        fs::create_dir_all(&self.schemas).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_builds_full_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let batch = BatchPaths::timestamped(tmp.path(), "20250506_083000");
        batch.create().await.unwrap();

        assert!(batch.root.ends_with("scraper_output_20250506_083000"));
        for subdir in OUTPUT_SUBDIRS {
            assert!(batch.root.join(subdir).is_dir(), "missing {subdir}");
        }
    }

    #[tokio::test]
    async fn test_task_paths_are_partitioned_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let batch = BatchPaths::new(tmp.path().join("out"));

        let a = batch.task_paths("alpha");
        let b = batch.task_paths("beta");
        assert_ne!(a.data, b.data);
        assert!(a.data.ends_with("data/alpha"));
        assert!(b.exports.ends_with("exports/beta"));

        a.create().await.unwrap();
        assert!(a.data.is_dir());
        assert!(a.schemas.is_dir());
    }

    #[test]
    fn test_conventional_files() {
        let batch = BatchPaths::new("/tmp/out");
        assert_eq!(
            batch.result_file("news"),
            PathBuf::from("/tmp/out/data/news/result.json")
        );
        assert_eq!(
            batch.task_config_file("news"),
            PathBuf::from("/tmp/out/schemas/news/config.json")
        );
        assert!(batch.report_json().ends_with("reports/scraping_report.json"));
    }
}
