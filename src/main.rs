//! # scrapeherd
//!
//! A batch scraping orchestrator: runs a heterogeneous set of scraping
//! tasks (Rust implementations in-process and scripts in external
//! runtimes) under a bounded concurrency budget, isolates per-task
//! failures, and aggregates everything into one report.
//!
//! ## Usage
//!
//! ```sh
//! scrapeherd -c config.yaml -o ./runs
//! ```
//!
//! ## Architecture
//!
//! One invocation is one batch:
//! 1. **Startup**: load config, build the task registry, probe the
//!    external runtime (fatal errors stop here, before any output exists)
//! 2. **Dispatch**: the scheduler fans descriptors out to a bounded pool
//!    under a single batch deadline
//! 3. **Aggregation**: outcomes fan in through the thread-safe aggregator
//! 4. **Output**: the report snapshot is written as JSON and HTML
//!
//! A batch whose tasks all fail still exits 0; only startup errors set a
//! non-zero exit status.

use std::error::Error;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod aggregator;
mod cli;
mod config;
mod environment;
mod error;
mod models;
mod paths;
mod reports;
mod runner;
mod scheduler;
mod scrapers;
mod utils;

use cli::Cli;
use paths::BatchPaths;
use scheduler::Scheduler;
use utils::batch_timestamp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("scrapeherd starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, "Parsed CLI arguments");

    // Fatal startup errors surface before any output directory is created.
    let mut config = config::load_config(&args.config).await?;
    if let Some(max_workers) = args.max_workers {
        config.parallelism.max_workers = max_workers;
    }
    if let Some(timeout) = args.timeout {
        config.parallelism.timeout = timeout;
    }

    environment::check_environment(&config).await?;

    // Early check: the output parent must be writable before we commit to
    // a batch root underneath it.
    utils::ensure_writable_dir(&args.output_dir).await?;

    let batch_started = Local::now();
    let batch = BatchPaths::timestamped(&args.output_dir, &batch_timestamp(batch_started));
    let descriptors = config::build_descriptors(&config, &batch);
    info!(
        tasks = descriptors.len(),
        max_workers = config.parallelism.max_workers,
        timeout_secs = config.parallelism.timeout,
        root = %batch.root.display(),
        "Batch configured"
    );

    let scheduler = Scheduler::new(batch.clone(), &config.external);
    let report = scheduler
        .run_batch(
            descriptors,
            config.parallelism.max_workers,
            Duration::from_secs(config.parallelism.timeout),
        )
        .await?;

    reports::json::write_report(&report, &batch).await?;
    reports::html::write_report(&report, &batch).await?;

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        succeeded = report.summary.tasks_succeeded,
        failed = report.summary.tasks_failed,
        items = report.summary.items_total,
        root = %batch.root.display(),
        "Batch complete"
    );

    // Individual task failures are in the report, not the exit status.
    Ok(())
}
