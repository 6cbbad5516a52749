use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RancherError {
    /// The program could not be started at all; no exit will ever be reported.
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Homestead is missing or not configured: {0}")]
    PreconditionFailed(String),

    #[error("Another operation is still running: {0}")]
    Busy(String),

    #[error("Command timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RancherError {
    /// True for errors raised before any process was started.
    pub fn never_started(&self) -> bool {
        matches!(
            self,
            RancherError::Spawn { .. }
                | RancherError::PreconditionFailed(_)
                | RancherError::Busy(_)
        )
    }
}

impl From<serde_yaml_ng::Error> for RancherError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        RancherError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RancherError {
    fn from(err: serde_json::Error) -> Self {
        RancherError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RancherError>;
