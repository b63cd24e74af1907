//! `logwarden block` command handler

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::error::StorageError;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::{IpCount, ThresholdMode, TimeWindow};
use logwarden_log_pipeline::{BlockDecider, BlockReport, BlockWriter};

use crate::cli::{BlockArgs, WindowArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `block` command.
pub async fn execute(
    args: BlockArgs,
    config: &LogwardenConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let store = super::open_store(config)?;
    let outcome = block_phase(&args.window, config.blocking.threshold_mode, store).await?;
    writer.render(&outcome)?;
    fail_on_block_errors(&outcome)
}

/// Decide offenders inside the window and record each one as blocked.
///
/// The aggregate query and the inserts run on the blocking pool, like ingestion.
pub(crate) async fn block_phase(
    args: &WindowArgs,
    default_mode: ThresholdMode,
    store: Arc<dyn AccessLogStore>,
) -> Result<BlockOutcome, CliError> {
    let window = args.window();
    let threshold = args.threshold;
    let mode = args.threshold_mode.unwrap_or(default_mode);

    let (offenders, report) = tokio::task::spawn_blocking(move || {
        let offenders = BlockDecider::new(Arc::clone(&store), mode).decide(&window, threshold)?;
        let report = BlockWriter::new(store, mode).block_all(&offenders, &window, threshold);
        Ok::<_, StorageError>((offenders, report))
    })
    .await
    .map_err(|e| CliError::Command(format!("blocking task failed: {e}")))??;

    info!(
        window = %window,
        blocked = report.blocked,
        already_blocked = report.already_blocked,
        failed = report.failed.len(),
        "blocking finished"
    );

    Ok(BlockOutcome {
        window,
        threshold,
        mode,
        offenders,
        report,
    })
}

/// Individual IPs that could not be recorded fail the command after rendering.
pub(crate) fn fail_on_block_errors(outcome: &BlockOutcome) -> Result<(), CliError> {
    if outcome.report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Command(format!(
            "{} of {} ips could not be blocked",
            outcome.report.failed.len(),
            outcome.offenders.len()
        )))
    }
}

/// Result of the blocking phase.
#[derive(Debug, Serialize)]
pub struct BlockOutcome {
    pub window: TimeWindow,
    pub threshold: u64,
    pub mode: ThresholdMode,
    /// Offenders with their request counts, highest first.
    pub offenders: Vec<IpCount>,
    #[serde(flatten)]
    pub report: BlockReport,
}

impl Render for BlockOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", "Decision".bold())?;
        writeln!(w, "  Window:            {}", self.window)?;
        writeln!(w, "  Threshold:         {} ({})", self.threshold, self.mode)?;
        if !self.offenders.is_empty() {
            writeln!(w, "  {:<40} {:>10}", "IP", "Requests")?;
            writeln!(w, "  {}", "-".repeat(51))?;
            for offender in &self.offenders {
                writeln!(w, "  {:<40} {:>10}", offender.ip, offender.count)?;
            }
        }
        writeln!(w)?;
        self.report.render_text(w)
    }
}
