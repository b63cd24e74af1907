//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! Pipeline reports get their text rendering here so `run`, `ingest` and `block`
//! print them the same way.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use logwarden_log_pipeline::{BlockReport, IngestReport};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)
    }

    fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

impl Render for IngestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", "Ingest".bold())?;
        writeln!(w, "  Source:            {}", self.source)?;
        writeln!(w, "  Lines read:        {}", self.lines_read)?;
        writeln!(w, "  Blank lines:       {}", self.blank_lines)?;
        writeln!(w, "  Stored:            {}", self.stored.to_string().green())?;
        writeln!(w, "  Already processed: {}", self.already_processed)?;

        let failed = self.failed();
        let failed_str = if failed == 0 {
            "0".green()
        } else {
            failed.to_string().red()
        };
        writeln!(
            w,
            "  Failed:            {} (decode: {}, storage: {})",
            failed_str, self.decode_errors, self.storage_errors
        )?;
        writeln!(w, "  Elapsed:           {} ms", self.elapsed_ms)?;

        if let Some(reason) = &self.read_error {
            writeln!(w, "  {} {}", "Read stopped:".red().bold(), reason)?;
        }

        if !self.failures.is_empty() {
            writeln!(w)?;
            writeln!(w, "  {:<8} {:<8} Reason", "Line", "Kind")?;
            writeln!(w, "  {}", "-".repeat(60))?;
            for failure in &self.failures {
                writeln!(
                    w,
                    "  {:<8} {:<8} {}",
                    failure.line_number,
                    failure.kind.as_str(),
                    failure.reason
                )?;
            }
            if self.failures_omitted > 0 {
                writeln!(w, "  ... {} more failures omitted", self.failures_omitted)?;
            }
        }
        Ok(())
    }
}

impl Render for BlockReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", "Block".bold())?;
        writeln!(w, "  Newly blocked:     {}", self.blocked.to_string().green())?;
        writeln!(w, "  Already blocked:   {}", self.already_blocked)?;
        if !self.failed.is_empty() {
            writeln!(
                w,
                "  Failed:            {}",
                self.failed.len().to_string().red()
            )?;
        }

        if self.ips.is_empty() {
            writeln!(w, "  No IP exceeded the threshold.")?;
        } else {
            writeln!(w)?;
            for ip in &self.ips {
                writeln!(w, "  {}", ip.yellow())?;
            }
        }

        for failure in &self.failed {
            writeln!(w, "  {} {}: {}", "x".red(), failure.ip, failure.reason)?;
        }
        Ok(())
    }
}
