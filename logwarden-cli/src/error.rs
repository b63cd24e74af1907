//! CLI-specific error types and exit code mapping

use logwarden_core::error::{ConfigError, LogwardenError, PipelineError, StorageError};
use logwarden_log_pipeline::LogPipelineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A command-line value was rejected after parsing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The store could not be opened or queried.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logwarden-core.
    #[error("{0}")]
    Core(#[from] LogwardenError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration or invalid argument        |
    /// | 3    | Storage unavailable                      |
    /// | 10   | IO error (including unreadable access log) |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) => 2,
            Self::Storage(_) => 3,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                LogwardenError::Config(_) => 2,
                LogwardenError::Storage(_) => 3,
                LogwardenError::Io(_) | LogwardenError::Pipeline(PipelineError::SourceUnavailable { .. }) => 10,
                LogwardenError::Pipeline(PipelineError::InitFailed(_)) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<LogPipelineError> for CliError {
    fn from(e: LogPipelineError) -> Self {
        Self::Core(e.into())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Core(e.into())
    }
}
