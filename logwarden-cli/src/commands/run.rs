//! `logwarden run` command handler
//!
//! Ingestion runs to completion before the blocking phase starts.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use logwarden_core::config::LogwardenConfig;
use logwarden_log_pipeline::IngestReport;

use super::block::{BlockOutcome, block_phase, fail_on_block_errors};
use super::ingest::{fail_on_read_error, ingest_phase};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: &LogwardenConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline_config = super::pipeline_config(config, args.accesslog, args.workers)?;
    let store = super::open_store(config)?;

    let ingest = ingest_phase(pipeline_config, Arc::clone(&store)).await?;

    // Counts from a partially read file are not a basis for blocking.
    if ingest.read_error.is_some() {
        warn!("skipping blocking phase after read failure");
        let report = RunReport {
            ingest,
            block: None,
        };
        writer.render(&report)?;
        return fail_on_read_error(&report.ingest);
    }

    let block = block_phase(&args.window, config.blocking.threshold_mode, store).await?;
    let report = RunReport {
        ingest,
        block: Some(block),
    };
    writer.render(&report)?;

    match &report.block {
        Some(outcome) => fail_on_block_errors(outcome),
        None => Ok(()),
    }
}

/// Combined ingest and block summary.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub ingest: IngestReport,
    pub block: Option<BlockOutcome>,
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.ingest.render_text(w)?;
        writeln!(w)?;
        match &self.block {
            Some(block) => block.render_text(w),
            None => writeln!(w, "Blocking skipped: the access log was not fully read."),
        }
    }
}
