//! Command handlers -- one module per subcommand

pub mod block;
pub mod blocked;
pub mod config;
pub mod ingest;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use logwarden_core::config::LogwardenConfig;
use logwarden_core::store::AccessLogStore;
use logwarden_log_pipeline::{PipelineConfig, PipelineConfigBuilder};

use crate::error::CliError;

/// Open the configured store (`[storage]` section).
pub(crate) fn open_store(config: &LogwardenConfig) -> Result<Arc<dyn AccessLogStore>, CliError> {
    let store = logwarden_storage::open_store(&config.storage)?;
    debug!(driver = store.driver_name(), "store opened");
    Ok(store)
}

/// Build the pipeline config from `[ingest]`, applying CLI overrides.
///
/// Overridden values are validated here so a bad `--workers` fails before the
/// store is touched.
pub(crate) fn pipeline_config(
    config: &LogwardenConfig,
    accesslog: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<PipelineConfig, CliError> {
    let mut builder = PipelineConfigBuilder::from_core(&config.ingest);
    if let Some(path) = accesslog {
        builder = builder.access_log(path.display().to_string());
    }
    if let Some(workers) = workers {
        builder = builder.workers(workers);
    }
    Ok(builder.build()?)
}
