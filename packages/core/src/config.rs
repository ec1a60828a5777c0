//! Document manager configuration
//!
//! Settings that are fixed for the lifetime of one manager: its name (used to
//! prefix errors), the default locale, the base path documents are filed
//! under, and the namespace prefixes used to encode property names.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::config::DocumentManagerConfig;
//!
//! let config = DocumentManagerConfig::from_json(r#"{"name": "live", "default_locale": "de"}"#)
//!     .unwrap();
//! assert_eq!(config.name, "live");
//! assert_eq!(config.base_path, "/cmf");
//! ```

use crate::error::{DocumentManagerError, Result};
use serde::{Deserialize, Serialize};

/// Namespace prefixes for each property encoding
///
/// `None` encodes properties without a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub system: Option<String>,
    pub system_localized: Option<String>,
    pub content: Option<String>,
    pub content_localized: Option<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            system: Some("sulu".to_string()),
            system_localized: Some("i18n".to_string()),
            content: None,
            content_localized: Some("i18n".to_string()),
        }
    }
}

/// Configuration for one document manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentManagerConfig {
    /// Manager name, prefixed to every error it raises
    pub name: String,

    /// Locale used when an operation does not specify one
    pub default_locale: String,

    /// Root below which filing subscribers place documents
    pub base_path: String,

    pub namespaces: NamespaceConfig,
}

impl Default for DocumentManagerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            default_locale: "en".to_string(),
            base_path: "/cmf".to_string(),
            namespaces: NamespaceConfig::default(),
        }
    }
}

impl DocumentManagerConfig {
    /// Load a configuration from JSON; missing keys fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            DocumentManagerError::invalid_argument(format!("Invalid configuration: {}", e))
        })?;
        config
            .validate()
            .map_err(|e| DocumentManagerError::invalid_argument(format!("Invalid configuration: {}", e)))?;
        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }

        if self.default_locale.trim().is_empty() {
            return Err("default_locale must not be empty".to_string());
        }

        if !self.base_path.starts_with('/') {
            return Err(format!(
                "base_path must be an absolute path, got \"{}\"",
                self.base_path
            ));
        }

        for prefix in [
            &self.namespaces.system,
            &self.namespaces.system_localized,
            &self.namespaces.content,
            &self.namespaces.content_localized,
        ]
        .into_iter()
        .flatten()
        {
            if prefix.is_empty() || prefix.contains(':') {
                return Err(format!("invalid namespace prefix \"{}\"", prefix));
            }
        }

        Ok(())
    }
}
