//! Document metadata
//!
//! [`Metadata`] describes one document type: its class (the Rust type
//! name), its alias, the repository type stored on its nodes, how to
//! instantiate it, and how each mapped field is stored. Field mappings start
//! from the defaults
//!
//! ```text
//! { encoding: content, property: <field name>, type: none, mapped: true, multiple: false, default: null }
//! ```
//!
//! and callers override only what differs.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::document::Document;
//! use docmapper_core::document_fields;
//! use docmapper_core::metadata::{MappingOptions, Metadata};
//! use docmapper_core::property_encoder::Encoding;
//!
//! #[derive(Debug, Default)]
//! struct Article {
//!     title: Option<String>,
//! }
//!
//! impl Document for Article {
//!     document_fields!(title);
//! }
//!
//! let metadata = Metadata::for_document::<Article>("article", "app:article")
//!     .with_field("title", MappingOptions::new().encoding(Encoding::ContentLocalized));
//!
//! assert_eq!(metadata.field_mapping("title").unwrap().property, "title");
//! assert!(metadata.field_mapping("body").is_err());
//! ```

mod factory;

pub use factory::MetadataFactory;

use crate::document::{Document, FieldValue};
use crate::error::{DocumentManagerError, Result};
use crate::property_encoder::Encoding;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Special handling of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A related document, stored as a reference to its node
    Reference,
    /// An RFC 3339 timestamp, validated on persist
    Date,
}

/// How one document field is stored on the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub encoding: Encoding,
    /// Unencoded property name
    pub property: String,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    /// Unmapped fields are declared but skipped by the mapping pipeline
    pub mapped: bool,
    pub multiple: bool,
    /// Value hydrated when the property is missing
    pub default: Value,
}

/// Overrides merged onto the default field mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingOptions {
    pub encoding: Option<Encoding>,
    pub property: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub mapped: Option<bool>,
    pub multiple: Option<bool>,
    pub default: Option<Value>,
}

impl MappingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn mapped(mut self, mapped: bool) -> Self {
        self.mapped = Some(mapped);
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn into_mapping(self, name: &str) -> FieldMapping {
        FieldMapping {
            encoding: self.encoding.unwrap_or_default(),
            property: self.property.unwrap_or_else(|| name.to_string()),
            field_type: self.field_type,
            mapped: self.mapped.unwrap_or(true),
            multiple: self.multiple.unwrap_or(false),
            default: self.default.unwrap_or(Value::Null),
        }
    }
}

/// Creates an empty instance of a document type
pub type DocumentConstructor = fn() -> Box<dyn Document>;

fn construct<D: Document + Default>() -> Box<dyn Document> {
    Box::new(D::default())
}

/// Mapping information for one document type
#[derive(Clone)]
pub struct Metadata {
    class: String,
    alias: String,
    repository_type: String,
    field_mappings: BTreeMap<String, FieldMapping>,
    constructor: DocumentConstructor,
}

impl Metadata {
    pub fn new(
        class: impl Into<String>,
        alias: impl Into<String>,
        repository_type: impl Into<String>,
        constructor: DocumentConstructor,
    ) -> Self {
        Self {
            class: class.into(),
            alias: alias.into(),
            repository_type: repository_type.into(),
            field_mappings: BTreeMap::new(),
            constructor,
        }
    }

    /// Metadata for `D`, using its type name as the class
    pub fn for_document<D: Document + Default>(
        alias: impl Into<String>,
        repository_type: impl Into<String>,
    ) -> Self {
        Self::new(std::any::type_name::<D>(), alias, repository_type, construct::<D>)
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Repository type (mixin) marking nodes of this document type
    pub fn repository_type(&self) -> &str {
        &self.repository_type
    }

    pub fn add_field_mapping(&mut self, name: impl Into<String>, options: MappingOptions) {
        let name = name.into();
        let mapping = options.into_mapping(&name);
        self.field_mappings.insert(name, mapping);
    }

    pub fn with_field(mut self, name: impl Into<String>, options: MappingOptions) -> Self {
        self.add_field_mapping(name, options);
        self
    }

    /// Add field mappings from a JSON object of `field -> overrides`
    pub fn add_field_mappings_from_json(&mut self, json: &str) -> Result<()> {
        let mappings: BTreeMap<String, MappingOptions> = serde_json::from_str(json).map_err(|e| {
            DocumentManagerError::invalid_argument(format!(
                "Invalid field mappings for \"{}\": {}",
                self.class, e
            ))
        })?;
        for (name, options) in mappings {
            self.add_field_mapping(name, options);
        }
        Ok(())
    }

    pub fn field_mappings(&self) -> &BTreeMap<String, FieldMapping> {
        &self.field_mappings
    }

    pub fn has_field_mapping(&self, name: &str) -> bool {
        self.field_mappings.contains_key(name)
    }

    /// # Errors
    ///
    /// `InvalidArgument` listing the mapped fields when `name` is not mapped.
    pub fn field_mapping(&self, name: &str) -> Result<&FieldMapping> {
        self.field_mappings
            .get(name)
            .ok_or_else(|| self.not_mapped(name))
    }

    /// A fresh, empty instance of the document type
    pub fn new_instance(&self) -> Box<dyn Document> {
        (self.constructor)()
    }

    /// Read a mapped field from `document`
    pub fn get_field_value(&self, document: &dyn Document, field: &str) -> Result<FieldValue> {
        self.field_mapping(field)?;
        document.field(field).ok_or_else(|| {
            DocumentManagerError::invalid_argument(format!(
                "Document \"{}\" has no field \"{}\"",
                self.class, field
            ))
        })
    }

    /// Write a mapped field on `document`
    pub fn set_field_value(
        &self,
        document: &mut dyn Document,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        self.field_mapping(field)?;
        document.set_field(field, value).map_err(|e| {
            DocumentManagerError::invalid_argument(format!(
                "Could not set field \"{}\" on document \"{}\": {}",
                field, self.class, e
            ))
        })
    }

    fn not_mapped(&self, field: &str) -> DocumentManagerError {
        DocumentManagerError::invalid_argument(format!(
            "Field \"{}\" is not mapped for document \"{}\". Mapped fields: \"{}\"",
            field,
            self.class,
            self.field_mappings
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\", \"")
        ))
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("class", &self.class)
            .field("alias", &self.alias)
            .field("repository_type", &self.repository_type)
            .field("field_mappings", &self.field_mappings)
            .finish()
    }
}
