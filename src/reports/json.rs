//! JSON report artifact.

use std::error::Error;

use tokio::fs;
use tracing::{info, instrument};

use crate::models::Report;
use crate::paths::BatchPaths;

/// Write the report snapshot to `reports/scraping_report.json`.
#[instrument(level = "info", skip_all, fields(root = %batch.root.display()))]
pub async fn write_report(report: &Report, batch: &BatchPaths) -> Result<(), Box<dyn Error>> {
    let rendered = serde_json::to_string_pretty(report)?;
    let path = batch.report_json();
    fs::create_dir_all(batch.reports_dir()).await?;
    fs::write(&path, rendered).await?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(())
}
