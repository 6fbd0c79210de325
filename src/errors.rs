//! Custom error types for stegsweep.
//!
//! Errors below the `analyze` boundary never escape as `Err`; the tool-level
//! variants exist so their `Display` text can be folded into a tool result.

use std::path::PathBuf;
use std::time::Duration;

use crate::tools::ToolKind;

/// The main error type for stegsweep operations.
#[derive(Debug, thiserror::Error)]
pub enum StegError {
    /// I/O error (scratch directory, report files, permissions, etc.)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the report file atomically failed
    #[error("Failed to persist results to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran past its deadline
    #[error("{tool} analysis timed out")]
    ToolTimeout { tool: ToolKind, limit: Duration },

    /// An external tool could not be launched or waited on
    #[error("{tool} error: {source}")]
    ToolLaunch {
        tool: ToolKind,
        #[source]
        source: std::io::Error,
    },

    /// Form worker channel error
    #[error("UI communication error: {0}")]
    UiChannel(String),

    /// Ctrl-C while the form was waiting
    #[error("Interrupted by user")]
    Interrupted,

    /// Tokio task join error
    #[error("Async task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias using StegError
pub type StegResult<T> = Result<T, StegError>;

impl StegError {
    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a launch error for a tool
    pub fn launch(tool: ToolKind, source: std::io::Error) -> Self {
        Self::ToolLaunch { tool, source }
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for StegError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
