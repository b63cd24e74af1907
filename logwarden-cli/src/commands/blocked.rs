//! `logwarden blocked` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::BlockedIp;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `blocked` command.
pub async fn execute(config: &LogwardenConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let store = super::open_store(config)?;
    let report = BlockedListReport {
        driver: store.driver_name().to_owned(),
        blocked: store.blocked_ips()?,
    };
    writer.render(&report)
}

/// Stored blocked IP rows.
#[derive(Debug, Serialize)]
pub struct BlockedListReport {
    pub driver: String,
    pub blocked: Vec<BlockedIp>,
}

impl Render for BlockedListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.blocked.is_empty() {
            writeln!(w, "No blocked IPs.")?;
            return Ok(());
        }

        writeln!(w, "{:<6} {:<40} Reason", "ID", "IP")?;
        writeln!(w, "{}", "-".repeat(100))?;
        for row in &self.blocked {
            writeln!(
                w,
                "{:<6} {:<40} {}",
                row.id,
                row.ip,
                row.reason.as_deref().unwrap_or("-")
            )?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "{} blocked ({})",
            self.blocked.len().to_string().bold(),
            self.driver
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_list() {
        let report = BlockedListReport {
            driver: "memory".to_owned(),
            blocked: Vec::new(),
        };
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "No blocked IPs.\n");
    }

    #[test]
    fn render_rows_with_and_without_reason() {
        let report = BlockedListReport {
            driver: "sqlite".to_owned(),
            blocked: vec![
                BlockedIp {
                    id: 1,
                    ip: "192.168.228.188".to_owned(),
                    reason: Some("More than 200 access between 2017-01-01.13:00:00 and 2017-01-02.13:00:00".to_owned()),
                },
                BlockedIp {
                    id: 2,
                    ip: "10.0.0.1".to_owned(),
                    reason: None,
                },
            ],
        };
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("192.168.228.188"));
        assert!(out.contains("More than 200 access"));
        assert!(out.contains("10.0.0.1"));
        assert!(out.contains("(sqlite)"));
    }
}
