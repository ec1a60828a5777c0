//! Document Manager Error Types
//!
//! Every façade operation returns [`DocumentManagerError`]. Errors raised
//! while dispatching an operation are wrapped exactly once in
//! [`DocumentManagerError::Named`], which prefixes the message with the name
//! of the owning manager (`"[default] ..."`). An error that already carries a
//! manager name is nested inside a new general error instead of being
//! renamed, so the full chain stays visible through `source()`.

use crate::events::options::OptionsError;
use crate::session::SessionError;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, DocumentManagerError>;

#[derive(Error, Debug)]
pub enum DocumentManagerError {
    /// Generic failure, optionally caused by another error
    #[error("{message}")]
    General {
        message: String,
        #[source]
        source: Option<Box<DocumentManagerError>>,
    },

    /// Identifier resolves to no node, or the document has an unexpected type
    #[error("{message}")]
    DocumentNotFound {
        message: String,
        #[source]
        source: Option<SessionError>,
    },

    /// The node is still referenced and cannot be removed
    #[error(
        "Document at \"{path}\" cannot be removed, it is still referenced by: {}",
        .references.join(", ")
    )]
    DocumentReferenced {
        path: String,
        /// Paths of the referencing properties
        references: Vec<String>,
    },

    #[error("{0}")]
    MetadataNotFound(String),

    #[error("{message}")]
    VersionNotFound {
        message: String,
        #[source]
        source: Option<SessionError>,
    },

    /// Bad input: unmapped fields, unknown aliases, misplaced documents
    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),

    /// Programmer misuse (unset event fields, detached proxies, borrow conflicts)
    #[error("{0}")]
    Runtime(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// An error surfaced through a named document manager
    #[error("[{manager}] {error}")]
    Named {
        manager: String,
        #[source]
        error: Box<DocumentManagerError>,
    },
}

impl DocumentManagerError {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
            source: None,
        }
    }

    pub fn general_with_source(message: impl Into<String>, source: DocumentManagerError) -> Self {
        Self::General {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn document_not_found(message: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            message: message.into(),
            source: None,
        }
    }

    pub fn metadata_not_found(message: impl Into<String>) -> Self {
        Self::MetadataNotFound(message.into())
    }

    pub fn version_not_found(message: impl Into<String>, source: Option<SessionError>) -> Self {
        Self::VersionNotFound {
            message: message.into(),
            source,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    pub fn named(manager: impl Into<String>, error: DocumentManagerError) -> Self {
        Self::Named {
            manager: manager.into(),
            error: Box::new(error),
        }
    }

    /// Name of the manager this error surfaced through, if any
    pub fn manager_name(&self) -> Option<&str> {
        match self {
            Self::Named { manager, .. } => Some(manager),
            _ => None,
        }
    }

    /// The error without any manager naming layers
    pub fn unnamed(&self) -> &Self {
        match self {
            Self::Named { error, .. } => error.unnamed(),
            other => other,
        }
    }

    /// Whether this error belongs to the document manager taxonomy
    ///
    /// Repository errors are foreign and get wrapped in a general error
    /// before being named.
    pub fn is_domain_error(&self) -> bool {
        !matches!(self, Self::Session(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_messages() {
        let error = DocumentManagerError::document_not_found(
            "Could not find document with ID or path \"/x\"",
        );
        assert_eq!(
            format!("{}", error),
            "Could not find document with ID or path \"/x\""
        );

        let error = DocumentManagerError::DocumentReferenced {
            path: "/cmf/a".to_string(),
            references: vec!["/cmf/b/link".to_string(), "/cmf/c/link".to_string()],
        };
        assert_eq!(
            format!("{}", error),
            "Document at \"/cmf/a\" cannot be removed, it is still referenced by: /cmf/b/link, /cmf/c/link"
        );
    }

    #[test]
    fn test_named_prefix_and_source() {
        let inner = DocumentManagerError::runtime("boom");
        let named = DocumentManagerError::named("default", inner);

        assert_eq!(format!("{}", named), "[default] boom");
        assert_eq!(named.manager_name(), Some("default"));
        assert_eq!(named.source().map(|s| s.to_string()), Some("boom".to_string()));
        assert!(matches!(named.unnamed(), DocumentManagerError::Runtime(_)));
    }

    #[test]
    fn test_general_with_source_chain() {
        let cause = DocumentManagerError::Session(SessionError::item_not_found("/x"));
        let error = DocumentManagerError::general_with_source("Error finding document", cause);

        assert_eq!(error.to_string(), "Error finding document");
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("Item not found at path \"/x\"".to_string())
        );
    }

    #[test]
    fn test_domain_error_classification() {
        assert!(DocumentManagerError::runtime("x").is_domain_error());
        assert!(!DocumentManagerError::from(SessionError::item_not_found("/x")).is_domain_error());
    }
}
