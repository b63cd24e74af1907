//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use logwarden_core::types::{ThresholdMode, TimeWindow, WindowDuration, parse_start_date};

/// Logwarden -- access log ingestion and IP blocking.
///
/// Use `logwarden <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logwarden", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logwarden.toml configuration file (defaults apply if it does not exist).
    #[arg(short, long, global = true, default_value = "logwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the access log, then block IPs over the threshold.
    Run(RunArgs),

    /// Ingest the access log only.
    Ingest(IngestArgs),

    /// Block IPs over the threshold using already stored events.
    Block(BlockArgs),

    /// List blocked IPs.
    Blocked,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- shared ----

/// Time window and threshold selection.
#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Window start in UTC, formatted yyyy-MM-dd.HH:mm:ss.
    #[arg(long, alias = "startDate", value_parser = parse_start_date_arg)]
    pub start_date: DateTime<Utc>,

    /// Window length (hourly, daily).
    #[arg(long)]
    pub duration: WindowDuration,

    /// Request count threshold.
    #[arg(long)]
    pub threshold: u64,

    /// Override the threshold comparison (exceeds, at_least).
    #[arg(long)]
    pub threshold_mode: Option<ThresholdMode>,
}

impl WindowArgs {
    /// Half-open window `[start, start + duration)`.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_date, self.duration)
    }
}

fn parse_start_date_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_start_date(raw).map_err(|e| e.to_string())
}

// ---- run ----

/// Ingest then block.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Access log path (overrides `ingest.access_log`).
    #[arg(long)]
    pub accesslog: Option<PathBuf>,

    /// Number of storage workers (overrides `ingest.workers`).
    #[arg(long)]
    pub workers: Option<usize>,
}

// ---- ingest ----

/// Ingest the access log into storage.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Access log path (overrides `ingest.access_log`).
    #[arg(long)]
    pub accesslog: Option<PathBuf>,

    /// Number of storage workers (overrides `ingest.workers`).
    #[arg(long)]
    pub workers: Option<usize>,
}

// ---- block ----

/// Block IPs using stored events.
#[derive(Args, Debug)]
pub struct BlockArgs {
    #[command(flatten)]
    pub window: WindowArgs,
}

// ---- config ----

/// Manage logwarden configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, storage, ingest, blocking).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_full() {
        let cli = Cli::try_parse_from([
            "logwarden",
            "run",
            "--start-date",
            "2017-01-01.13:00:00",
            "--duration",
            "hourly",
            "--threshold",
            "100",
            "--accesslog",
            "/tmp/access.log",
        ])
        .expect("should parse run");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(
                    args.window.start_date,
                    Utc.with_ymd_and_hms(2017, 1, 1, 13, 0, 0).unwrap()
                );
                assert_eq!(args.window.duration, WindowDuration::Hourly);
                assert_eq!(args.window.threshold, 100);
                assert_eq!(args.accesslog, Some(PathBuf::from("/tmp/access.log")));
                assert!(args.window.threshold_mode.is_none());
                assert_eq!(
                    args.window.window().end,
                    Utc.with_ymd_and_hms(2017, 1, 1, 14, 0, 0).unwrap()
                );
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_legacy_start_date_flag() {
        let cli = Cli::try_parse_from([
            "logwarden",
            "run",
            "--startDate=2017-01-01.00:00:00",
            "--duration=daily",
            "--threshold=250",
        ])
        .expect("should accept --startDate alias");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.window.duration, WindowDuration::Daily);
                assert_eq!(args.window.threshold, 250);
                assert!(args.accesslog.is_none());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_duration() {
        let result = Cli::try_parse_from([
            "logwarden",
            "block",
            "--start-date",
            "2017-01-01.00:00:00",
            "--duration",
            "weekly",
            "--threshold",
            "1",
        ]);
        assert!(result.is_err(), "weekly is not a valid duration");
    }

    #[test]
    fn test_cli_rejects_bad_start_date() {
        let result = Cli::try_parse_from([
            "logwarden",
            "block",
            "--start-date",
            "01/01/2017",
            "--duration",
            "daily",
            "--threshold",
            "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_negative_threshold() {
        let result = Cli::try_parse_from([
            "logwarden",
            "block",
            "--start-date",
            "2017-01-01.00:00:00",
            "--duration",
            "daily",
            "--threshold",
            "-5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_threshold_mode_override() {
        let cli = Cli::try_parse_from([
            "logwarden",
            "block",
            "--start-date",
            "2017-01-01.00:00:00",
            "--duration",
            "daily",
            "--threshold",
            "10",
            "--threshold-mode",
            "at_least",
        ])
        .expect("should parse block");
        match cli.command {
            Commands::Block(args) => {
                assert_eq!(args.window.threshold_mode, Some(ThresholdMode::AtLeast));
            }
            _ => panic!("expected Block command"),
        }
    }

    #[test]
    fn test_cli_parse_ingest_defaults() {
        let cli = Cli::try_parse_from(["logwarden", "ingest"]).expect("should parse ingest");
        match cli.command {
            Commands::Ingest(args) => {
                assert!(args.accesslog.is_none());
                assert!(args.workers.is_none());
            }
            _ => panic!("expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["logwarden", "config", "show", "--section", "storage"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("storage".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logwarden",
            "blocked",
            "--output",
            "json",
            "-c",
            "/etc/logwarden.toml",
            "--log-level",
            "debug",
        ])
        .expect("global flags should be accepted after subcommand");
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.config, PathBuf::from("/etc/logwarden.toml"));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        assert!(Cli::try_parse_from(["logwarden"]).is_err());
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "logwarden");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for name in ["run", "ingest", "block", "blocked", "config"] {
            assert!(subcommands.contains(&name), "should have '{name}' subcommand");
        }
        cmd.debug_assert();
    }
}
