//! Run-level error types for the lecture indexer

use std::path::PathBuf;

/// Result type for lecture indexer operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while building a lecture index
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error("No scan directory given (usage: lecture-index <DIR>)")]
    MissingArgument,

    #[error("Scan directory does not exist or is not a directory: {0}")]
    InvalidDirectory(PathBuf),

    #[error("Media probe utility `{0}` could not be started; install ffmpeg or pass --ffprobe")]
    MissingProbeUtility(String),

    #[error("Could not probe duration of {path}: {reason}")]
    ProbeFailure { path: PathBuf, reason: String },

    #[error("Probing {path} timed out after {seconds}s")]
    ProbeTimeout { path: PathBuf, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// Whether this error must abort the whole run.
    ///
    /// Per-file probe problems are isolated to that file; everything else
    /// unwinds the scan.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            IndexError::ProbeFailure { .. } | IndexError::ProbeTimeout { .. }
        )
    }
}
