//! Log-store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions while appending to or reading a log.
///
/// Unreadable log content is not an error: it is reported through
/// [`LogStatus::Recovered`](crate::LogStatus::Recovered) instead.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read log {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write log {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
