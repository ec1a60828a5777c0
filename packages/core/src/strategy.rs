//! Node creation and type resolution policy
//!
//! A [`DocumentStrategy`] decides how a document's node is created, how the
//! metadata of an existing node is found, and how queries restrict their
//! source to one document type. [`MixinStrategy`] marks nodes with the
//! document's repository type as a mixin.

use crate::document::DocumentRef;
use crate::error::Result;
use crate::metadata::{Metadata, MetadataFactory};
use crate::session::qom::{Constraint, DynamicOperand, Operator, StaticOperand};
use crate::session::{NodeId, Session, JCR_MIXIN_TYPES, JCR_UUID, NT_UNSTRUCTURED};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub trait DocumentStrategy {
    /// Create the node `name` below `parent` for `document`
    fn create_node_for_document(
        &self,
        session: &dyn Session,
        document: &DocumentRef,
        parent: NodeId,
        name: &str,
    ) -> Result<NodeId>;

    /// Metadata of the document type stored at `node`, if any
    fn resolve_metadata_for_node(
        &self,
        session: &dyn Session,
        node: NodeId,
    ) -> Result<Option<Arc<Metadata>>>;

    /// Node type queried for documents of `class`
    fn primary_node_type(&self, class: &str) -> String;

    /// Constraint restricting the selector `source_alias` to documents of `class`
    fn create_source_constraint(&self, source_alias: &str, class: &str) -> Result<Constraint>;
}

/// Stores the repository type of a document as a mixin on its node
pub struct MixinStrategy {
    metadata_factory: Arc<MetadataFactory>,
}

impl MixinStrategy {
    pub fn new(metadata_factory: Arc<MetadataFactory>) -> Self {
        Self { metadata_factory }
    }
}

impl DocumentStrategy for MixinStrategy {
    fn create_node_for_document(
        &self,
        session: &dyn Session,
        document: &DocumentRef,
        parent: NodeId,
        name: &str,
    ) -> Result<NodeId> {
        let metadata = self.metadata_factory.metadata_for_class(document.type_name())?;

        // a uuid assigned before the first persist becomes the node identifier
        let uuid = document
            .raw_mut()?
            .uuid_behavior()
            .and_then(|behavior| behavior.uuid().map(str::to_string))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let node = session.add_node(parent, name)?;
        session.add_mixin(node, metadata.repository_type())?;
        session.set_property(node, JCR_UUID, Value::String(uuid))?;
        debug!("Created node {} for {}", session.path(node)?, metadata.alias());
        Ok(node)
    }

    fn resolve_metadata_for_node(
        &self,
        session: &dyn Session,
        node: NodeId,
    ) -> Result<Option<Arc<Metadata>>> {
        if !session.has_property(node, JCR_MIXIN_TYPES)? {
            return Ok(None);
        }

        for mixin in session.mixins(node)? {
            if self.metadata_factory.has_metadata_for_repository_type(&mixin) {
                return self.metadata_factory.metadata_for_repository_type(&mixin).map(Some);
            }
        }
        Ok(None)
    }

    fn primary_node_type(&self, _class: &str) -> String {
        NT_UNSTRUCTURED.to_string()
    }

    fn create_source_constraint(&self, source_alias: &str, class: &str) -> Result<Constraint> {
        let metadata = self.metadata_factory.metadata_for_class(class)?;
        Ok(Constraint::comparison(
            DynamicOperand::property(source_alias, JCR_MIXIN_TYPES),
            Operator::EqualTo,
            StaticOperand::Literal(Value::String(metadata.repository_type().to_string())),
        ))
    }
}
