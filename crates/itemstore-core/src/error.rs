//! Error types for itemstore-core.

use crate::naming::{NAME_PATTERN, TYPE_PATTERN};
use thiserror::Error;

/// Result type alias for itemstore-core operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Boxed cause carried by internal failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller-facing category of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed or cannot be applied.
    Validation,
    /// The addressed resource already exists.
    Conflict,
    /// The addressed resource does not exist.
    NotFound,
    /// Something failed on our side.
    Internal,
}

impl ErrorKind {
    /// Stable machine-checkable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the item service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The type path segment is not a plural noun.
    #[error("you should set plural form of the type, got '{0}'")]
    NotPlural(String),

    /// The singular type does not match the type pattern.
    #[error("type '{0}' is not valid, it should be a string that matches the regex '{pattern}'", pattern = TYPE_PATTERN)]
    InvalidType(String),

    /// The name does not match the name pattern.
    #[error("name '{0}' is not valid, it should be a string that matches the regex '{pattern}'", pattern = NAME_PATTERN)]
    InvalidName(String),

    /// Create was called without a name.
    #[error("name field is required")]
    MissingName,

    /// The request body could not be decoded.
    #[error("error on decode request body")]
    InvalidBody(#[source] serde_json::Error),

    /// The declared patch format is not one we understand.
    #[error("unsupported patch format '{0}'")]
    UnsupportedPatchFormat(String),

    /// The patch document could not be decoded for its format.
    #[error("error on decode {format} document")]
    MalformedPatch {
        format: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The patch decoded fine but cannot be applied to the item.
    #[error("patch cannot be applied: {0}")]
    PatchNotApplicable(String),

    /// An item with the same type and name already exists.
    #[error("{item_type} with name '{name}' already exists")]
    Conflict { item_type: String, name: String },

    /// No item with this type and name.
    #[error("{item_type} with name '{name}' not found")]
    NotFound { item_type: String, name: String },

    /// A repository call or serialization step failed.
    #[error("error on {step}")]
    Internal {
        step: &'static str,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Wrap an unexpected failure with the pipeline step it happened in.
    pub fn internal(step: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            step,
            source: source.into(),
        }
    }

    /// Category used by transports to pick a response.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotPlural(_)
            | Self::InvalidType(_)
            | Self::InvalidName(_)
            | Self::MissingName
            | Self::InvalidBody(_)
            | Self::UnsupportedPatchFormat(_)
            | Self::MalformedPatch { .. }
            | Self::PatchNotApplicable(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}
