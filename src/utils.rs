//! Small helpers shared across the orchestrator: filesystem probes, log
//! truncation, and batch timestamps.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::{info, instrument};

/// Timestamp used to name the batch output root, e.g. `20250506_083000`.
pub fn batch_timestamp(start: DateTime<Local>) -> String {
    start.format("%Y%m%d_%H%M%S").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended. Used for stderr excerpts in process-failure payloads.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…(+{} bytes)", &s[..end], s.len() - end)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Small sync write using std fs (simpler error surface).
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
