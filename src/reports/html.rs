//! Human-readable HTML report.
//!
//! Rendering is a pure function of the [`Report`] snapshot; the writer just
//! puts the rendered page next to the JSON artifact.

use std::error::Error;
use std::fmt::Write as _;

use tokio::fs;
use tracing::{info, instrument};

use crate::models::{Report, TaskKind, TaskStatus};
use crate::paths::BatchPaths;

/// Write the rendered report to `reports/scraping_report.html`.
#[instrument(level = "info", skip_all, fields(root = %batch.root.display()))]
pub async fn write_report(report: &Report, batch: &BatchPaths) -> Result<(), Box<dyn Error>> {
    let path = batch.report_html();
    fs::create_dir_all(batch.reports_dir()).await?;
    fs::write(&path, render(report)).await?;
    info!(path = %path.display(), "Wrote HTML report");
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::InProcess => "in_process",
        TaskKind::ExternalProcess => "external_process",
    }
}

/// Render the report as a standalone HTML page.
pub fn render(report: &Report) -> String {
    let summary = &report.summary;
    let mut page = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Web Scraping Report - {date}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        h1, h2 {{ color: #333; }}
        .summary {{ background-color: #f5f5f5; padding: 15px; border-radius: 5px; }}
        .success {{ color: green; }}
        .error {{ color: red; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
        th {{ background-color: #f2f2f2; }}
        tr:nth-child(even) {{ background-color: #f9f9f9; }}
    </style>
</head>
<body>
    <h1>Web Scraping Report</h1>

    <div class="summary">
        <h2>Summary</h2>
        <p><strong>Start Time:</strong> {start}</p>
        <p><strong>End Time:</strong> {end}</p>
        <p><strong>Duration:</strong> {duration:.2} seconds</p>
        <p><strong>Tasks Submitted:</strong> {submitted}</p>
        <p><strong>Tasks Succeeded:</strong> <span class="success">{succeeded}</span></p>
        <p><strong>Tasks Failed:</strong> <span class="error">{failed}</span></p>
        <p><strong>Items Collected:</strong> {items}</p>
        <p><strong>Output Directory:</strong> {output}</p>
    </div>

    <h2>Scraper Details</h2>
    <table>
        <tr>
            <th>Name</th>
            <th>Type</th>
            <th>Status</th>
            <th>Items</th>
            <th>Started</th>
            <th>Ended</th>
        </tr>
"#,
        date = summary.start_time.format("%Y-%m-%d"),
        start = summary.start_time.to_rfc3339(),
        end = summary.end_time.to_rfc3339(),
        duration = summary.duration_seconds,
        submitted = summary.tasks_submitted,
        succeeded = summary.tasks_succeeded,
        failed = summary.tasks_failed,
        items = summary.items_total,
        output = escape(&summary.output_directory),
    );

    for outcome in &report.scraper_details {
        let (class, label) = match outcome.status {
            TaskStatus::Success => ("success", "success"),
            TaskStatus::Failed => ("error", "failed"),
        };
        let _ = write!(
            page,
            r#"        <tr>
            <td>{name}</td>
            <td>{kind}</td>
            <td class="{class}">{label}</td>
            <td>{items}</td>
            <td>{started}</td>
            <td>{ended}</td>
        </tr>
"#,
            name = escape(&outcome.name),
            kind = kind_label(outcome.kind),
            items = outcome.items_processed,
            started = outcome.started_at.to_rfc3339(),
            ended = outcome.ended_at.to_rfc3339(),
        );
    }
    page.push_str("    </table>\n");

    if !report.errors.is_empty() {
        page.push_str(
            r#"
    <h2>Errors</h2>
    <table>
        <tr>
            <th>Task</th>
            <th>Kind</th>
            <th>Error</th>
        </tr>
"#,
        );
        for entry in &report.errors {
            let _ = write!(
                page,
                r#"        <tr>
            <td>{task}</td>
            <td>{kind:?}</td>
            <td class="error">{error}</td>
        </tr>
"#,
                task = escape(&entry.task),
                kind = entry.kind,
                error = escape(&entry.error),
            );
        }
        page.push_str("    </table>\n");
    }

    let _ = write!(
        page,
        "\n    <p><em>Report generated on {}</em></p>\n</body>\n</html>\n",
        summary.end_time.format("%Y-%m-%d %H:%M:%S")
    );
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TaskError, TaskErrorKind};
    use crate::models::{
        BatchErrorEntry, ReportSummary, TaskDescriptor, TaskOutcome,
    };
    use crate::paths::TaskPaths;
    use chrono::Local;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report_with_failure() -> Report {
        let now = Local::now();
        let descriptor = TaskDescriptor {
            id: "news".to_string(),
            kind: TaskKind::ExternalProcess,
            name: "news <script>".to_string(),
            config: BTreeMap::new(),
            output_paths: TaskPaths {
                data: PathBuf::from("/out/data/news"),
                exports: PathBuf::from("/out/exports/news"),
                schemas: PathBuf::from("/out/schemas/news"),
            },
        };
        Report {
            summary: ReportSummary {
                start_time: now,
                end_time: now,
                duration_seconds: 0.25,
                tasks_submitted: 1,
                tasks_succeeded: 0,
                tasks_failed: 1,
                items_total: 0,
                output_directory: "/out".to_string(),
            },
            errors: vec![BatchErrorEntry {
                task: "news".to_string(),
                kind: TaskErrorKind::Timeout,
                error: "task still outstanding".to_string(),
            }],
            scraper_details: vec![TaskOutcome::failed(
                &descriptor,
                TaskError::timeout(Duration::from_secs(30)),
                now,
            )],
        }
    }

    #[test]
    fn test_render_includes_details_and_errors() {
        let page = render(&report_with_failure());
        assert!(page.contains("<h2>Scraper Details</h2>"));
        assert!(page.contains("<h2>Errors</h2>"));
        assert!(page.contains("Timeout"));
        assert!(page.contains("external_process"));
        assert!(page.contains(r#"class="error">failed"#));
    }

    #[test]
    fn test_render_escapes_html_in_names() {
        let page = render(&report_with_failure());
        assert!(page.contains("news &lt;script&gt;"));
        assert!(!page.contains("news <script>"));
    }

    #[test]
    fn test_errors_section_omitted_when_clean() {
        let mut report = report_with_failure();
        report.errors.clear();
        let page = render(&report);
        assert!(!page.contains("<h2>Errors</h2>"));
    }
}
