use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a monitoring run or prevent it from starting.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Status store error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unrecognized status record in {}: {content:?}", path.display())]
    CorruptStatus { path: PathBuf, content: String },
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MonitorError::Storage { path: path.into(), source }
    }
}
