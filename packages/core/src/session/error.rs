//! Repository session errors
//!
//! Errors raised by [`Session`](super::Session) implementations. The document
//! manager never handles these itself; they bubble up through the pipeline and
//! are wrapped by the façade.

use thiserror::Error;

/// Result type for repository session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors produced by the content repository boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Item not found at path \"{0}\"")]
    ItemNotFound(String),

    #[error("Node with identifier \"{0}\" not found")]
    NodeNotFound(String),

    #[error("An item already exists at path \"{0}\"")]
    ItemExists(String),

    #[error("Invalid path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unsupported repository operation: {0}")]
    UnsupportedRepositoryOperation(String),

    #[error("Version \"{version}\" does not exist for node \"{path}\"")]
    VersionNotFound { path: String, version: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Repository state unavailable: {0}")]
    InvalidState(String),
}

impl SessionError {
    pub fn item_not_found(path: impl Into<String>) -> Self {
        Self::ItemNotFound(path.into())
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    /// Whether the error means "nothing is stored there"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound(_) | Self::NodeNotFound(_))
    }
}
