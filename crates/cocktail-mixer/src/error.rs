use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while validating or running a mix.
#[derive(Debug, Error)]
pub enum MixError {
    /// The job violates a structural invariant (empty model list, weight
    /// count mismatch, non-positive temperature, ...).
    #[error("{0}")]
    InvalidJob(String),

    /// A model given as a local path does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Every mix slot is taken.
    #[error("mixer busy: all {capacity} mix slot(s) are in use")]
    Busy { capacity: usize },

    /// Another in-flight mix is already writing to this output path.
    #[error("output path is already being written by another mix: {}", .0.display())]
    OutputInUse(PathBuf),

    /// The mix did not finish before the configured deadline.
    #[error("mix timed out after {0:?}")]
    Timeout(Duration),

    /// The mixing library reported a failure; the text is its own message.
    #[error("{0}")]
    Backend(String),

    /// The mixer program could not be started.
    #[error("failed to launch mixer program '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A filesystem or pipe I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize the job document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for mixing operations.
pub type Result<T> = std::result::Result<T, MixError>;
