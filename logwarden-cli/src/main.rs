//! logwarden -- access log ingestion and IP blocking
//!
//! Loads `logwarden.toml` (defaults apply when the default file is absent),
//! initializes logging, and dispatches to the subcommand handlers.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use logwarden_core::config::{GeneralConfig, LogwardenConfig};
use logwarden_core::error::LogwardenError;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = LogwardenConfig::load_or_default(&cli.config).await;

    // Logging comes up even when the config is broken so the failure is reported.
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }
    logwarden_core::metrics::describe_all();

    if let Err(e) = dispatch(cli, loaded).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn dispatch(
    cli: Cli,
    loaded: Result<LogwardenConfig, LogwardenError>,
) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        // `config` loads the file itself so `config validate` can report errors.
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
        Commands::Run(args) => commands::run::execute(args, &loaded?, &writer).await,
        Commands::Ingest(args) => commands::ingest::execute(args, &loaded?, &writer).await,
        Commands::Block(args) => commands::block::execute(args, &loaded?, &writer).await,
        Commands::Blocked => commands::blocked::execute(&loaded?, &writer).await,
    }
}
