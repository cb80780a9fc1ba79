//! Runner error types.

use std::path::PathBuf;

use ebi_device::DeviceError;
use ebi_protocol::ProtocolError;
use thiserror::Error;

/// Errors that end a runner command.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Talking to the module failed.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// An argument or config value was rejected by the protocol layer.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The config file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadConfig {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`RunnerConfig`](crate::config::RunnerConfig).
    #[error("invalid config {}: {source}", path.display())]
    ParseConfig {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// A command line argument could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// A result could not be rendered as JSON.
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
