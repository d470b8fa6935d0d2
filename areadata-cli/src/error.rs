//! CLI error type.

use std::process::ExitCode;

use areadata::config::ConfigError;
use areadata::UploadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{failed} of {total} file(s) failed to upload")]
    UploadsFailed { failed: usize, total: usize },

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) => ExitCode::from(2),
            CliError::Interrupted => ExitCode::from(130),
            _ => ExitCode::FAILURE,
        }
    }
}
