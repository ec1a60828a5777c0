//! Content Repository Session Abstraction
//!
//! The document manager maps documents onto a hierarchical content repository:
//! a tree of addressable nodes carrying typed properties, mixin types,
//! references and a version history. This module defines that boundary as the
//! [`Session`] trait so the mapping pipeline never depends on a concrete
//! backend.
//!
//! # Architecture
//!
//! ```text
//! DocumentManager → EventDispatcher → Subscribers → NodeManager → Session (trait)
//!                                                                     ↓
//!                                                             InMemorySession
//!                                                             (or any backend)
//! ```
//!
//! Nodes are addressed by [`NodeId`] handles. A handle is only meaningful for
//! the session that produced it; all reads and writes go through the session.
//!
//! # Staging
//!
//! Writes are staged until [`Session::save`]. [`Session::refresh`] with
//! `keep_changes = false` discards everything staged, [`Session::revert`]
//! discards staged changes below a single node.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::session::{InMemorySession, Session};
//! use serde_json::json;
//!
//! let session = InMemorySession::new();
//! let root = session.root_node();
//! let node = session.add_node(root, "articles").unwrap();
//! session.set_property(node, "title", json!("Hello")).unwrap();
//! session.save().unwrap();
//!
//! assert_eq!(session.path(node).unwrap(), "/articles");
//! ```

mod error;
mod evaluate;
mod memory;
pub mod qom;
pub mod sql2;

#[cfg(test)]
mod memory_test;

pub use error::{SessionError, SessionResult};
pub use memory::InMemorySession;
pub use qom::QueryObjectModel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Property holding the stable identifier of referenceable nodes
pub const JCR_UUID: &str = "jcr:uuid";

/// Multi-valued property listing the mixin types of a node
pub const JCR_MIXIN_TYPES: &str = "jcr:mixinTypes";

/// Property holding the primary type of a node
pub const JCR_PRIMARY_TYPE: &str = "jcr:primaryType";

/// Mixin making a node addressable by identifier
pub const MIX_REFERENCEABLE: &str = "mix:referenceable";

/// Mixin enabling version history for a node
pub const MIX_VERSIONABLE: &str = "mix:versionable";

/// Primary type given to every node created through the mapper
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

/// Opaque handle to a node inside one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Plain JSON value (string, number, bool, array)
    #[default]
    Generic,
    /// Identifier(s) of other nodes; enforces referential integrity on remove
    Reference,
    /// Identifier(s) of other nodes without integrity guarantees
    WeakReference,
}

impl PropertyType {
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference | Self::WeakReference)
    }
}

/// A reference property on another node pointing at a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyReference {
    /// Node holding the reference property
    pub node: NodeId,
    /// Name of the reference property
    pub name: String,
    /// Full path of the property (`<node path>/<name>`)
    pub path: String,
}

/// A checkpoint in the version history of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: String,
    pub created: DateTime<Utc>,
}

/// One result row of a query
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub node: NodeId,
    pub path: String,
    pub selector: String,
    /// Column name → value (absent properties are `Value::Null`)
    pub values: BTreeMap<String, Value>,
}

impl Row {
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Abstraction over a content repository session
///
/// All methods take `&self`: sessions are single-threaded handles using
/// interior mutability, owned by one document manager at a time.
pub trait Session {
    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// The root node (`/`)
    fn root_node(&self) -> NodeId;

    /// Resolve an absolute path to a node
    ///
    /// # Errors
    ///
    /// `ItemNotFound` when nothing exists at the path.
    fn node_by_path(&self, path: &str) -> SessionResult<NodeId>;

    /// Resolve a node by the value of its `jcr:uuid` property
    fn node_by_identifier(&self, identifier: &str) -> SessionResult<NodeId>;

    /// Whether a node exists at `path`
    fn node_exists(&self, path: &str) -> bool {
        self.node_by_path(path).is_ok()
    }

    /// Absolute path of a node
    fn path(&self, node: NodeId) -> SessionResult<String>;

    /// Local name of a node (empty for the root)
    fn name(&self, node: NodeId) -> SessionResult<String>;

    /// Parent of a node; `ItemNotFound` for the root
    fn parent(&self, node: NodeId) -> SessionResult<NodeId>;

    /// Number of ancestors (the root has depth 0)
    fn depth(&self, node: NodeId) -> SessionResult<usize>;

    /// Ordered children of a node
    fn children(&self, node: NodeId) -> SessionResult<Vec<NodeId>>;

    /// Ordered names of the children of a node
    fn child_names(&self, node: NodeId) -> SessionResult<Vec<String>> {
        self.children(node)?
            .into_iter()
            .map(|child| self.name(child))
            .collect()
    }

    /// Child of `node` called `name`
    fn child(&self, node: NodeId, name: &str) -> SessionResult<NodeId>;

    fn has_child(&self, node: NodeId, name: &str) -> SessionResult<bool> {
        match self.child(node, name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The stable identifier of a referenceable node
    fn identifier(&self, node: NodeId) -> SessionResult<Option<String>> {
        Ok(self
            .property(node, JCR_UUID)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append a new child node
    ///
    /// # Errors
    ///
    /// `ItemExists` when the parent already has a child with that name.
    fn add_node(&self, parent: NodeId, name: &str) -> SessionResult<NodeId>;

    /// Remove a node and its whole subtree
    fn remove(&self, node: NodeId) -> SessionResult<()>;

    /// Move the node at `src_path` to `dest_path` (the new full path)
    fn move_node(&self, src_path: &str, dest_path: &str) -> SessionResult<()>;

    /// Copy the subtree at `src_path` to `dest_path`; the copy gets fresh identifiers
    fn copy(&self, src_path: &str, dest_path: &str) -> SessionResult<()>;

    /// Rename a node in place, keeping its position among its siblings
    fn rename(&self, node: NodeId, new_name: &str) -> SessionResult<()>;

    /// Place child `src_name` before child `dest_name`, or last when `dest_name` is `None`
    fn order_before(
        &self,
        parent: NodeId,
        src_name: &str,
        dest_name: Option<&str>,
    ) -> SessionResult<()>;

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    fn property(&self, node: NodeId, name: &str) -> SessionResult<Option<Value>>;

    fn property_type(&self, node: NodeId, name: &str) -> SessionResult<Option<PropertyType>>;

    fn has_property(&self, node: NodeId, name: &str) -> SessionResult<bool> {
        Ok(self.property(node, name)?.is_some())
    }

    /// Set a generic property; `Value::Null` removes it
    fn set_property(&self, node: NodeId, name: &str, value: Value) -> SessionResult<()> {
        self.set_typed_property(node, name, value, PropertyType::Generic)
    }

    /// Set a property with an explicit storage type; `Value::Null` removes it
    fn set_typed_property(
        &self,
        node: NodeId,
        name: &str,
        value: Value,
        kind: PropertyType,
    ) -> SessionResult<()>;

    fn remove_property(&self, node: NodeId, name: &str) -> SessionResult<()>;

    /// Properties whose name matches a glob pattern (`*` wildcard, `|` alternatives)
    fn properties(&self, node: NodeId, pattern: &str) -> SessionResult<BTreeMap<String, Value>>;

    /// Strong reference properties of other nodes pointing at `node`
    fn references(&self, node: NodeId) -> SessionResult<Vec<PropertyReference>>;

    /// Add a mixin type to `jcr:mixinTypes` (no-op when already present)
    fn add_mixin(&self, node: NodeId, mixin: &str) -> SessionResult<()> {
        let mut mixins = self.mixins(node)?;
        if mixins.iter().any(|existing| existing == mixin) {
            return Ok(());
        }
        mixins.push(mixin.to_string());
        self.set_property(node, JCR_MIXIN_TYPES, Value::from(mixins))
    }

    fn mixins(&self, node: NodeId) -> SessionResult<Vec<String>> {
        Ok(match self.property(node, JCR_MIXIN_TYPES)? {
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(single)) => vec![single],
            _ => Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Make every staged change durable
    fn save(&self) -> SessionResult<()>;

    /// Reload from the persisted state; `keep_changes = false` discards staged changes
    fn refresh(&self, keep_changes: bool) -> SessionResult<()>;

    /// Discard staged changes of one node and its subtree
    fn revert(&self, node: NodeId) -> SessionResult<()>;

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    fn is_checked_out(&self, path: &str) -> SessionResult<bool>;

    fn checkout(&self, path: &str) -> SessionResult<()>;

    /// Record a new version and leave the node checked in
    fn checkin(&self, path: &str) -> SessionResult<VersionInfo>;

    /// Record a new version and leave the node checked out
    fn checkpoint(&self, path: &str) -> SessionResult<VersionInfo>;

    fn version_history(&self, path: &str) -> SessionResult<Vec<VersionInfo>>;

    /// Properties frozen when `version` was recorded
    fn frozen_properties(&self, path: &str, version: &str)
        -> SessionResult<BTreeMap<String, Value>>;

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Parse a JCR-SQL2 statement into a query object model
    fn create_query(&self, statement: &str) -> SessionResult<QueryObjectModel> {
        sql2::parse(statement)
    }

    /// Run a query object model against the session state
    fn execute_query(
        &self,
        query: &QueryObjectModel,
        bindings: &BTreeMap<String, Value>,
        limit: Option<usize>,
        offset: usize,
    ) -> SessionResult<Vec<Row>>;
}

/// Join a parent path and a child name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Parent portion of an absolute path (`/` for top-level paths)
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Last segment of an absolute path
pub fn path_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "cmf"), "/cmf");
        assert_eq!(join_path("/cmf", "articles"), "/cmf/articles");
        assert_eq!(join_path("/cmf/", "articles"), "/cmf/articles");
    }

    #[test]
    fn test_parent_path_and_name() {
        assert_eq!(parent_path("/cmf/articles/foo"), "/cmf/articles");
        assert_eq!(parent_path("/cmf"), "/");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(path_name("/cmf/articles/foo"), "foo");
        assert_eq!(path_name("/"), "");
    }

    #[test]
    fn test_property_type_is_reference() {
        assert!(PropertyType::Reference.is_reference());
        assert!(PropertyType::WeakReference.is_reference());
        assert!(!PropertyType::Generic.is_reference());
    }
}
