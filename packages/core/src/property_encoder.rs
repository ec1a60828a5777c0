//! Property name encoding
//!
//! Document fields are stored as namespaced repository properties. The
//! encoding of a field decides the namespace and whether the locale is part
//! of the name:
//!
//! | encoding            | stored as               | default prefix |
//! |---------------------|-------------------------|----------------|
//! | `system`            | `<prefix>:<name>`          | `sulu`      |
//! | `system_localized`  | `<prefix>:<locale>-<name>` | `i18n`      |
//! | `content`           | `<name>`                   | none        |
//! | `content_localized` | `<prefix>:<locale>-<name>` | `i18n`      |
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::config::NamespaceConfig;
//! use docmapper_core::property_encoder::{Encoding, PropertyEncoder};
//!
//! let encoder = PropertyEncoder::new(NamespaceConfig::default());
//! assert_eq!(
//!     encoder.encode(Encoding::SystemLocalized, "created", Some("fr")).unwrap(),
//!     "i18n:fr-created"
//! );
//! ```

use crate::config::NamespaceConfig;
use crate::error::{DocumentManagerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    System,
    SystemLocalized,
    #[default]
    Content,
    ContentLocalized,
}

impl Encoding {
    pub fn is_localized(&self) -> bool {
        matches!(self, Self::SystemLocalized | Self::ContentLocalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::SystemLocalized => "system_localized",
            Self::Content => "content",
            Self::ContentLocalized => "content_localized",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = DocumentManagerError;

    fn from_str(keyword: &str) -> Result<Self> {
        match keyword {
            "system" => Ok(Self::System),
            "system_localized" => Ok(Self::SystemLocalized),
            "content" => Ok(Self::Content),
            "content_localized" => Ok(Self::ContentLocalized),
            other => Err(DocumentManagerError::invalid_argument(format!(
                "Unknown encoding \"{}\", expected one of \"system\", \"system_localized\", \
                 \"content\", \"content_localized\"",
                other
            ))),
        }
    }
}

/// Encodes logical field names into repository property names
#[derive(Debug, Clone, Default)]
pub struct PropertyEncoder {
    namespaces: NamespaceConfig,
}

impl PropertyEncoder {
    pub fn new(namespaces: NamespaceConfig) -> Self {
        Self { namespaces }
    }

    pub fn prefix(&self, encoding: Encoding) -> Option<&str> {
        match encoding {
            Encoding::System => self.namespaces.system.as_deref(),
            Encoding::SystemLocalized => self.namespaces.system_localized.as_deref(),
            Encoding::Content => self.namespaces.content.as_deref(),
            Encoding::ContentLocalized => self.namespaces.content_localized.as_deref(),
        }
    }

    /// Encode `name` for `encoding`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when a localized encoding is requested without a locale.
    pub fn encode(&self, encoding: Encoding, name: &str, locale: Option<&str>) -> Result<String> {
        let prefix = self.prefix(encoding);
        if !encoding.is_localized() {
            return Ok(match prefix {
                Some(prefix) => format!("{}:{}", prefix, name),
                None => name.to_string(),
            });
        }

        let locale = locale.filter(|locale| !locale.is_empty()).ok_or_else(|| {
            DocumentManagerError::invalid_argument(format!(
                "Cannot encode property \"{}\" with encoding \"{}\" without a locale",
                name, encoding
            ))
        })?;
        Ok(Self::qualify(prefix, &format!("{}-{}", locale, name)))
    }

    pub fn system_name(&self, name: &str) -> String {
        Self::qualify(self.namespaces.system.as_deref(), name)
    }

    pub fn localized_system_name(&self, name: &str, locale: &str) -> String {
        Self::qualify(
            self.namespaces.system_localized.as_deref(),
            &format!("{}-{}", locale, name),
        )
    }

    pub fn content_name(&self, name: &str) -> String {
        Self::qualify(self.namespaces.content.as_deref(), name)
    }

    pub fn localized_content_name(&self, name: &str, locale: &str) -> String {
        Self::qualify(
            self.namespaces.content_localized.as_deref(),
            &format!("{}-{}", locale, name),
        )
    }

    /// Glob matching every property of a localized encoding in `locale`
    pub fn localized_pattern(&self, encoding: Encoding, locale: &str) -> Result<String> {
        self.encode(encoding, "*", Some(locale))
    }

    /// Reverse [`encode`](Self::encode); `None` when the property does not belong to the encoding
    pub fn decode(&self, encoding: Encoding, property: &str, locale: Option<&str>) -> Option<String> {
        let unprefixed = match self.prefix(encoding) {
            Some(prefix) => property.strip_prefix(prefix)?.strip_prefix(':')?,
            None => property,
        };
        if !encoding.is_localized() {
            return Some(unprefixed.to_string());
        }
        let locale = locale?;
        unprefixed
            .strip_prefix(locale)?
            .strip_prefix('-')
            .map(str::to_string)
    }

    fn qualify(prefix: Option<&str>, name: &str) -> String {
        match prefix {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        }
    }
}
