//! Command-line interface definitions for the orchestrator.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for a single batch run.
///
/// # Examples
///
/// ```sh
/// # Run with the default config, writing under the current directory
/// scrapeherd
///
/// # Explicit config and output parent, tighter budget
/// scrapeherd -c ./config.yaml -o ./runs --max-workers 2 --timeout 120
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Parent directory for the timestamped batch output root
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Override the configured concurrency budget
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Override the configured batch deadline, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["scrapeherd"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert!(cli.max_workers.is_none());
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "scrapeherd",
            "-c",
            "/etc/scrapeherd.yaml",
            "-o",
            "/var/runs",
            "--max-workers",
            "2",
            "--timeout",
            "120",
        ]);
        assert_eq!(cli.config, PathBuf::from("/etc/scrapeherd.yaml"));
        assert_eq!(cli.output_dir, PathBuf::from("/var/runs"));
        assert_eq!(cli.max_workers, Some(2));
        assert_eq!(cli.timeout, Some(120));
    }
}
