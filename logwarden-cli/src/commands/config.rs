//! `logwarden config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logwarden_core::config::LogwardenConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
const SECTIONS: [&str; 4] = ["general", "storage", "ingest", "blocking"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load the file strictly (a missing file is an error here) and report the result.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match LogwardenConfig::load(config_path).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };
    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = LogwardenConfig::load_or_default(config_path).await?;
    let report = build_report(&config, config_path, section)?;
    writer.render(&report)
}

fn build_report(
    config: &LogwardenConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let (config_toml, config_json) = match section.as_deref() {
        None => encode(config)?,
        Some("general") => encode(&config.general)?,
        Some("storage") => encode(&config.storage)?,
        Some("ingest") => encode(&config.ingest)?,
        Some("blocking") => encode(&config.blocking)?,
        Some(other) => {
            return Err(CliError::InvalidArgument(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: config_json,
        config_toml,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<(String, serde_json::Value), CliError> {
    let toml = toml::to_string_pretty(value)
        .map_err(|e| CliError::Config(format!("failed to serialize configuration: {e}")))?;
    let json = serde_json::to_value(value)?;
    Ok((toml, json))
}

/// Configuration display report.
///
/// Text output prints the TOML form; JSON output embeds the same values as an object.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    /// `None` means the full configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty if valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(report: &dyn Render) -> String {
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_build_report_full_config() {
        let config = LogwardenConfig::default();
        let report = build_report(&config, Path::new("logwarden.toml"), None).expect("report");

        assert!(report.section.is_none());
        assert!(report.config_toml.contains("[storage]"));
        assert!(report.config_toml.contains("[ingest]"));
        assert_eq!(report.config["storage"]["driver"].as_str(), Some("sqlite"));
        assert_eq!(report.config["ingest"]["workers"].as_u64(), Some(1));
    }

    #[test]
    fn test_build_report_single_section() {
        let config = LogwardenConfig::default();
        let report = build_report(
            &config,
            Path::new("logwarden.toml"),
            Some("blocking".to_owned()),
        )
        .expect("report");

        assert!(report.config_toml.contains("threshold_mode = \"exceeds\""));
        assert_eq!(report.config["threshold_mode"].as_str(), Some("exceeds"));

        let output = render(&report);
        assert!(output.contains("[blocking]"));
        assert!(output.contains("logwarden.toml"));
    }

    #[test]
    fn test_build_report_unknown_section() {
        let config = LogwardenConfig::default();
        let err = build_report(&config, Path::new("x.toml"), Some("ebpf".to_owned()))
            .err()
            .expect("unknown section should fail");
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("general, storage, ingest, blocking"));
    }

    #[test]
    fn test_config_report_json_skips_toml_text() {
        let config = LogwardenConfig::default();
        let report = build_report(&config, Path::new("test.toml"), Some("general".to_owned()))
            .expect("report");
        let json = serde_json::to_value(&report).expect("json");

        assert_eq!(json["source"].as_str(), Some("test.toml"));
        assert_eq!(json["section"].as_str(), Some("general"));
        assert_eq!(json["config"]["log_level"].as_str(), Some("info"));
        assert!(json.get("config_toml").is_none());
    }

    #[test]
    fn test_config_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'ingest.workers'".to_owned()],
        };
        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("ingest.workers"));
    }

    #[test]
    fn test_config_validation_report_valid() {
        let report = ConfigValidationReport {
            source: "good.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };
        let output = render(&report);
        assert!(output.contains("VALID"));
        assert!(!output.contains("Error:"));
    }
}
