//! Documents
//!
//! A document is a caller-defined struct mapped to and from a repository
//! node. The mapper never knows concrete document types; it talks to them
//! through two channels:
//!
//! - **Reflection-style field access** ([`Document::field`] /
//!   [`Document::set_field`]), driven by the field mappings declared in
//!   [`Metadata`](crate::metadata::Metadata). The [`document_fields!`] macro
//!   generates both methods from a list of struct fields.
//! - **Optional capabilities**: a document opts into behaviors (uuid, parent,
//!   children, versions, auto naming, ...) by returning itself from the
//!   matching accessor. Subscribers check for capabilities, never for types.
//!
//! Documents are handled through [`DocumentRef`], a shared handle whose
//! pointer identity is the document identity used by the registry.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::document::{Document, DocumentRef, UuidBehavior};
//! use docmapper_core::document_fields;
//!
//! #[derive(Debug, Default)]
//! struct Article {
//!     title: Option<String>,
//!     tags: Vec<String>,
//!     uuid: Option<String>,
//! }
//!
//! impl UuidBehavior for Article {
//!     fn uuid(&self) -> Option<&str> {
//!         self.uuid.as_deref()
//!     }
//!     fn set_uuid(&mut self, uuid: String) {
//!         self.uuid = Some(uuid);
//!     }
//! }
//!
//! impl Document for Article {
//!     document_fields!(title, tags);
//!
//!     fn uuid_behavior(&mut self) -> Option<&mut dyn UuidBehavior> {
//!         Some(self)
//!     }
//! }
//!
//! let article = DocumentRef::new(Article::default());
//! article.write(|a: &mut Article| a.title = Some("Hello".into())).unwrap();
//! assert_eq!(article.read(|a: &Article| a.title.clone()).unwrap().as_deref(), Some("Hello"));
//! ```

mod behavior;
mod handle;

pub use behavior::{
    AutoNameBehavior, BlameBehavior, ChildrenBehavior, LocaleBehavior, NodeNameBehavior,
    ParentBehavior, PathBehavior, ReferrerBehavior, TimestampBehavior, UuidBehavior,
    VersionBehavior,
};
pub use handle::{DocumentKey, DocumentRef, Initializer, WeakDocumentRef};

use serde_json::Value;
use std::any::Any;

/// Upcast helper implemented for every sized `'static` type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Value of a mapped document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any serde-representable value
    Value(Value),
    /// A related document, stored as a node reference
    Reference(Option<DocumentRef>),
}

impl FieldValue {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Value(value) => value.is_null(),
            Self::Reference(reference) => reference.is_none(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Reference(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Reference(_) => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<DocumentRef>> for FieldValue {
    fn from(reference: Option<DocumentRef>) -> Self {
        Self::Reference(reference)
    }
}

/// A mappable domain object
pub trait Document: AsAny {
    /// Fully qualified type name, used as the metadata class
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Read a field by name; `None` when the document has no such field
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Write a field by name
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), String>;

    fn uuid_behavior(&mut self) -> Option<&mut dyn UuidBehavior> {
        None
    }

    fn node_name_behavior(&mut self) -> Option<&mut dyn NodeNameBehavior> {
        None
    }

    fn path_behavior(&mut self) -> Option<&mut dyn PathBehavior> {
        None
    }

    fn parent_behavior(&mut self) -> Option<&mut dyn ParentBehavior> {
        None
    }

    fn children_behavior(&mut self) -> Option<&mut dyn ChildrenBehavior> {
        None
    }

    fn referrer_behavior(&mut self) -> Option<&mut dyn ReferrerBehavior> {
        None
    }

    fn locale_behavior(&mut self) -> Option<&mut dyn LocaleBehavior> {
        None
    }

    fn auto_name_behavior(&mut self) -> Option<&mut dyn AutoNameBehavior> {
        None
    }

    fn blame_behavior(&mut self) -> Option<&mut dyn BlameBehavior> {
        None
    }

    fn timestamp_behavior(&mut self) -> Option<&mut dyn TimestampBehavior> {
        None
    }

    fn version_behavior(&mut self) -> Option<&mut dyn VersionBehavior> {
        None
    }

    /// File new documents below the configured base path
    fn uses_base_path(&self) -> bool {
        false
    }

    /// File documents below a folder named after their pluralized alias
    fn uses_alias_filing(&self) -> bool {
        false
    }

    /// Always file below the base path, ignoring the document's own parent
    fn uses_reset_filing_path(&self) -> bool {
        false
    }
}

#[doc(hidden)]
pub use serde_json as __serde_json;

/// Implement [`Document::field`] and [`Document::set_field`] for struct fields
///
/// Plain fields go through serde; reference fields must be
/// `Option<DocumentRef>`.
///
/// ```rust,ignore
/// impl Document for Article {
///     document_fields!(title, body);
/// }
///
/// impl Document for Link {
///     document_fields!(values: [title], references: [target]);
/// }
/// ```
#[macro_export]
macro_rules! document_fields {
    ($($field:ident),* $(,)?) => {
        $crate::document_fields!(values: [$($field),*], references: []);
    };
    (values: [$($field:ident),* $(,)?], references: [$($reference:ident),* $(,)?]) => {
        fn field(&self, name: &str) -> ::std::option::Option<$crate::document::FieldValue> {
            match name {
                $(
                    stringify!($field) => $crate::document::__serde_json::to_value(&self.$field)
                        .ok()
                        .map($crate::document::FieldValue::Value),
                )*
                $(
                    stringify!($reference) => ::std::option::Option::Some(
                        $crate::document::FieldValue::Reference(self.$reference.clone()),
                    ),
                )*
                _ => ::std::option::Option::None,
            }
        }

        fn set_field(
            &mut self,
            name: &str,
            value: $crate::document::FieldValue,
        ) -> ::std::result::Result<(), ::std::string::String> {
            match name {
                $(
                    stringify!($field) => {
                        let value = value
                            .into_value()
                            .ok_or_else(|| format!("Field \"{}\" does not hold a reference", name))?;
                        self.$field = $crate::document::__serde_json::from_value(value)
                            .map_err(|e| format!("Invalid value for field \"{}\": {}", name, e))?;
                        ::std::result::Result::Ok(())
                    }
                )*
                $(
                    stringify!($reference) => match value {
                        $crate::document::FieldValue::Reference(reference) => {
                            self.$reference = reference;
                            ::std::result::Result::Ok(())
                        }
                        $crate::document::FieldValue::Value(value) if value.is_null() => {
                            self.$reference = ::std::option::Option::None;
                            ::std::result::Result::Ok(())
                        }
                        $crate::document::FieldValue::Value(_) => ::std::result::Result::Err(
                            format!("Field \"{}\" only accepts document references", name),
                        ),
                    },
                )*
                _ => ::std::result::Result::Err(format!("Unknown field \"{}\"", name)),
            }
        }
    };
}
