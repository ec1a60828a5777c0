//! Events mapping a document to and from its node

use super::options::{Options, OptionsExt};
use super::stage::{HydrateStage, PersistStage, PublishStage, RestoreStage, Stage};
use super::{impl_event, EventBase};
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::session::NodeId;
use serde_json::Value;
use std::ops::{Deref, DerefMut};

/// Document, node, locale and options shared by the mapping channels
#[derive(Debug, Default)]
pub struct MappingEvent {
    pub(super) base: EventBase,
    document: Option<DocumentRef>,
    node: Option<NodeId>,
    locale: Option<String>,
    options: Options,
}

impl MappingEvent {
    fn new(
        document: Option<DocumentRef>,
        node: Option<NodeId>,
        locale: Option<String>,
        options: Options,
    ) -> Self {
        Self {
            base: EventBase::default(),
            document,
            node,
            locale,
            options,
        }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Result<&DocumentRef> {
        self.document.as_ref().ok_or_else(|| {
            DocumentManagerError::runtime(
                "Trying to retrieve document when no document has been set on the event",
            )
        })
    }

    pub fn set_document(&mut self, document: DocumentRef) {
        self.document = Some(document);
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

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = Some(locale.into());
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name).filter(|value| !value.is_null())
    }

    pub fn str_option(&self, name: &str) -> Option<&str> {
        self.options.str_option(name)
    }

    pub fn bool_option(&self, name: &str) -> bool {
        self.options.bool_option(name)
    }
}

macro_rules! mapping_deref {
    ($event:ty) => {
        impl Deref for $event {
            type Target = MappingEvent;

            fn deref(&self) -> &MappingEvent {
                &self.mapping
            }
        }

        impl DerefMut for $event {
            fn deref_mut(&mut self) -> &mut MappingEvent {
                &mut self.mapping
            }
        }
    };
}

/// Load a node into a document
///
/// Without a document, the pipeline reuses the registered document for the
/// node or instantiates one from the node's metadata.
#[derive(Debug)]
pub struct HydrateEvent {
    mapping: MappingEvent,
}

impl HydrateEvent {
    pub fn new(node: NodeId, locale: Option<String>, options: Options) -> Self {
        Self {
            mapping: MappingEvent::new(None, Some(node), locale, options),
        }
    }

    /// Hydrate into an existing document instance
    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.mapping.document = Some(document);
        self
    }
}

mapping_deref!(HydrateEvent);
impl_event!(HydrateEvent, HydrateStage, "document_manager.hydrate", mapping.base);

/// Write a document to its node, creating the node when needed
#[derive(Debug)]
pub struct PersistEvent {
    mapping: MappingEvent,
    parent_node: Option<NodeId>,
}

impl PersistEvent {
    pub fn new(document: DocumentRef, locale: Option<String>, options: Options) -> Self {
        Self {
            mapping: MappingEvent::new(Some(document), None, locale, options),
            parent_node: None,
        }
    }

    pub fn has_parent_node(&self) -> bool {
        self.parent_node.is_some()
    }

    pub fn parent_node(&self) -> Result<NodeId> {
        self.parent_node.ok_or_else(|| {
            DocumentManagerError::runtime(
                "Trying to retrieve parent node when no parent node has been set. \
                 A filing listener should set the parent node.",
            )
        })
    }

    pub fn set_parent_node(&mut self, parent: NodeId) {
        self.parent_node = Some(parent);
    }
}

mapping_deref!(PersistEvent);
impl_event!(PersistEvent, PersistStage, "document_manager.persist", mapping.base);

/// Record a new version of a document in a locale
#[derive(Debug)]
pub struct PublishEvent {
    mapping: MappingEvent,
}

impl PublishEvent {
    pub fn new(document: DocumentRef, locale: impl Into<String>, options: Options) -> Self {
        Self {
            mapping: MappingEvent::new(Some(document), None, Some(locale.into()), options),
        }
    }
}

mapping_deref!(PublishEvent);
impl_event!(PublishEvent, PublishStage, "document_manager.publish", mapping.base);

#[derive(Debug)]
pub struct UnpublishEvent {
    mapping: MappingEvent,
}

impl UnpublishEvent {
    pub fn new(document: DocumentRef, locale: impl Into<String>) -> Self {
        Self {
            mapping: MappingEvent::new(Some(document), None, Some(locale.into()), Options::new()),
        }
    }
}

mapping_deref!(UnpublishEvent);
impl_event!(UnpublishEvent, Stage, "document_manager.unpublish", mapping.base);

#[derive(Debug)]
pub struct RemoveDraftEvent {
    mapping: MappingEvent,
}

impl RemoveDraftEvent {
    pub fn new(document: DocumentRef, locale: impl Into<String>) -> Self {
        Self {
            mapping: MappingEvent::new(Some(document), None, Some(locale.into()), Options::new()),
        }
    }
}

mapping_deref!(RemoveDraftEvent);
impl_event!(RemoveDraftEvent, Stage, "document_manager.remove_draft", mapping.base);

/// Restore the localized properties of a document from a version
#[derive(Debug)]
pub struct RestoreEvent {
    mapping: MappingEvent,
    version: String,
}

impl RestoreEvent {
    pub fn new(
        document: DocumentRef,
        locale: impl Into<String>,
        version: impl Into<String>,
        options: Options,
    ) -> Self {
        Self {
            mapping: MappingEvent::new(Some(document), None, Some(locale.into()), options),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

mapping_deref!(RestoreEvent);
impl_event!(RestoreEvent, RestoreStage, "document_manager.restore", mapping.base);
