//! Events of the façade operations that do not map fields themselves

use super::options::{Options, OptionsSchema};
use super::stage::{FlushStage, MoveStage, RemoveStage, ReorderStage, Stage};
use super::{impl_event, EventBase};
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::session::NodeId;

/// Collects the option declarations of one channel
#[derive(Debug)]
pub struct ConfigureOptionsEvent {
    base: EventBase,
    event_name: &'static str,
    schema: OptionsSchema,
}

impl ConfigureOptionsEvent {
    pub fn new(event_name: &'static str, schema: OptionsSchema) -> Self {
        Self {
            base: EventBase::default(),
            event_name,
            schema,
        }
    }

    /// Channel whose options are being configured
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    pub fn schema(&self) -> &OptionsSchema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut OptionsSchema {
        &mut self.schema
    }

    pub fn into_schema(self) -> OptionsSchema {
        self.schema
    }
}

impl_event!(ConfigureOptionsEvent, Stage, "document_manager.configure_options");

/// Resolve an identifier (path or UUID) to a hydrated document
#[derive(Debug)]
pub struct FindEvent {
    base: EventBase,
    identifier: String,
    locale: Option<String>,
    options: Options,
    document: Option<DocumentRef>,
}

impl FindEvent {
    pub fn new(identifier: impl Into<String>, locale: Option<String>, options: Options) -> Self {
        Self {
            base: EventBase::default(),
            identifier: identifier.into(),
            locale,
            options,
            document: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn document(&self) -> Result<&DocumentRef> {
        self.document
            .as_ref()
            .ok_or_else(|| DocumentManagerError::runtime("No document has been set on the find event"))
    }

    pub fn set_document(&mut self, document: DocumentRef) {
        self.document = Some(document);
    }

    pub fn into_document(self) -> Result<DocumentRef> {
        self.document
            .ok_or_else(|| DocumentManagerError::runtime("No document has been set on the find event"))
    }
}

impl_event!(FindEvent, Stage, "document_manager.find");

/// Instantiate a new, unpersisted document for an alias
#[derive(Debug)]
pub struct CreateEvent {
    base: EventBase,
    alias: String,
    document: Option<DocumentRef>,
}

impl CreateEvent {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            base: EventBase::default(),
            alias: alias.into(),
            document: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn document(&self) -> Result<&DocumentRef> {
        self.document.as_ref().ok_or_else(|| {
            DocumentManagerError::runtime("No document has been set on the create event")
        })
    }

    pub fn set_document(&mut self, document: DocumentRef) {
        self.document = Some(document);
    }

    pub fn into_document(self) -> Result<DocumentRef> {
        self.document.ok_or_else(|| {
            DocumentManagerError::runtime("No document has been set on the create event")
        })
    }
}

impl_event!(CreateEvent, Stage, "document_manager.create");

#[derive(Debug)]
pub struct RemoveEvent {
    base: EventBase,
    document: DocumentRef,
}

impl RemoveEvent {
    pub fn new(document: DocumentRef) -> Self {
        Self {
            base: EventBase::default(),
            document,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }
}

impl_event!(RemoveEvent, RemoveStage, "document_manager.remove");

/// Move a document below the node identified by `dest_id`
#[derive(Debug)]
pub struct MoveEvent {
    base: EventBase,
    document: DocumentRef,
    dest_id: String,
    dest_name: Option<String>,
}

impl MoveEvent {
    pub fn new(document: DocumentRef, dest_id: impl Into<String>) -> Self {
        Self {
            base: EventBase::default(),
            document,
            dest_id: dest_id.into(),
            dest_name: None,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Path or UUID of the new parent
    pub fn dest_id(&self) -> &str {
        &self.dest_id
    }

    /// Name below the new parent, when a listener resolved one
    pub fn dest_name(&self) -> Option<&str> {
        self.dest_name.as_deref()
    }

    pub fn set_dest_name(&mut self, name: impl Into<String>) {
        self.dest_name = Some(name.into());
    }
}

impl_event!(MoveEvent, MoveStage, "document_manager.move");

/// Copy a document below the node at `dest_path`
#[derive(Debug)]
pub struct CopyEvent {
    base: EventBase,
    document: DocumentRef,
    dest_path: String,
    dest_name: Option<String>,
    copied_path: Option<String>,
    copied_node: Option<NodeId>,
}

impl CopyEvent {
    pub fn new(document: DocumentRef, dest_path: impl Into<String>) -> Self {
        Self {
            base: EventBase::default(),
            document,
            dest_path: dest_path.into(),
            dest_name: None,
            copied_path: None,
            copied_node: None,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }

    pub fn dest_name(&self) -> Option<&str> {
        self.dest_name.as_deref()
    }

    pub fn set_dest_name(&mut self, name: impl Into<String>) {
        self.dest_name = Some(name.into());
    }

    pub fn copied_path(&self) -> Result<&str> {
        self.copied_path.as_deref().ok_or_else(|| {
            DocumentManagerError::runtime("No copied path has been set on the copy event")
        })
    }

    pub fn copied_node(&self) -> Option<NodeId> {
        self.copied_node
    }

    pub fn set_copied(&mut self, path: impl Into<String>, node: NodeId) {
        self.copied_path = Some(path.into());
        self.copied_node = Some(node);
    }
}

impl_event!(CopyEvent, MoveStage, "document_manager.copy");

/// Place a document before (or after) a sibling
#[derive(Debug)]
pub struct ReorderEvent {
    base: EventBase,
    document: DocumentRef,
    dest_id: Option<String>,
    after: bool,
    node: Option<NodeId>,
}

impl ReorderEvent {
    pub fn new(document: DocumentRef, dest_id: Option<String>, after: bool) -> Self {
        Self {
            base: EventBase::default(),
            document,
            dest_id,
            after,
            node: None,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Path or UUID of the sibling; `None` moves the document to the end
    pub fn dest_id(&self) -> Option<&str> {
        self.dest_id.as_deref()
    }

    pub fn after(&self) -> bool {
        self.after
    }

    pub fn has_node(&self) -> bool {
        self.node.is_some()
    }

    pub fn node(&self) -> Result<NodeId> {
        self.node.ok_or_else(|| {
            DocumentManagerError::runtime(
                "Trying to retrieve node when no node has been set on the event",
            )
        })
    }

    pub fn set_node(&mut self, node: NodeId) {
        self.node = Some(node);
    }
}

impl_event!(ReorderEvent, ReorderStage, "document_manager.reorder");

/// Discard staged changes of a document's node and hydrate it again
#[derive(Debug)]
pub struct RefreshEvent {
    base: EventBase,
    document: DocumentRef,
}

impl RefreshEvent {
    pub fn new(document: DocumentRef) -> Self {
        Self {
            base: EventBase::default(),
            document,
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }
}

impl_event!(RefreshEvent, Stage, "document_manager.refresh");

#[derive(Debug, Default)]
pub struct FlushEvent {
    base: EventBase,
}

impl FlushEvent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl_event!(FlushEvent, FlushStage, "document_manager.flush");

#[derive(Debug, Default)]
pub struct ClearEvent {
    base: EventBase,
}

impl ClearEvent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl_event!(ClearEvent, Stage, "document_manager.clear");
