//! Error types for the filesystem backend.

use itemstore_core::RepositoryError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur in filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// Workspace not found at the specified path.
    #[error("workspace not found at '{0}'")]
    WorkspaceNotFound(PathBuf),

    /// Workspace already exists.
    #[error("workspace already exists at '{0}'")]
    WorkspaceExists(PathBuf),

    /// A type or name that cannot be used as a path segment.
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<FsError> for RepositoryError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => Self::NotFound,
            err => Self::backend(err),
        }
    }
}
