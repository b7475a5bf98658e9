//! Error types for the core infrastructure.

use thiserror::Error;

use crate::recorder::RecorderError;

/// Failures raised by the virtual file tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A recorder was registered for a path that does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Applying a file's recorded edits failed.
    #[error("failed to patch {path}: {source}")]
    Recorder {
        path: String,
        #[source]
        source: RecorderError,
    },

    /// Reading or writing the backing directory failed.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
