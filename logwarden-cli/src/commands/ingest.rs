//! `logwarden ingest` command handler

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use logwarden_core::config::LogwardenConfig;
use logwarden_core::store::AccessLogStore;
use logwarden_log_pipeline::{IngestReport, IngestionPipeline};

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `ingest` command.
pub async fn execute(
    args: IngestArgs,
    config: &LogwardenConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pipeline_config = super::pipeline_config(config, args.accesslog, args.workers)?;
    let store = super::open_store(config)?;

    let report = ingest_phase(pipeline_config, store).await?;
    writer.render(&report)?;
    fail_on_read_error(&report)
}

/// Run ingestion over the configured access log.
///
/// An unreadable access log aborts before any row is written.
pub(crate) async fn ingest_phase(
    pipeline_config: logwarden_log_pipeline::PipelineConfig,
    store: Arc<dyn AccessLogStore>,
) -> Result<IngestReport, CliError> {
    let path = PathBuf::from(&pipeline_config.access_log);
    let mut pipeline = IngestionPipeline::new(pipeline_config, store)?;
    let report = pipeline.run(&path).await?;

    info!(
        source = %report.source,
        stored = report.stored,
        already_processed = report.already_processed,
        failed = report.failed(),
        elapsed_ms = report.elapsed_ms,
        "ingestion finished"
    );
    if report.failed() > 0 {
        warn!(
            decode_errors = report.decode_errors,
            storage_errors = report.storage_errors,
            "some lines were not stored"
        );
    }
    Ok(report)
}

/// A read failure partway through the file is reported after rendering.
///
/// Line-level failures are isolated and never fail the command.
pub(crate) fn fail_on_read_error(report: &IngestReport) -> Result<(), CliError> {
    match &report.read_error {
        Some(reason) => Err(CliError::Io(std::io::Error::other(format!(
            "reading {} stopped after line {}: {}",
            report.source, report.lines_read, reason
        )))),
        None => Ok(()),
    }
}
