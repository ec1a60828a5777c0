use crate::context::DocumentManagerContext;
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, MoveEvent, MoveStage,
    Options, PersistEvent, PersistStage,
};
use crate::session::{NodeId, NT_UNSTRUCTURED};
use std::rc::Rc;
use tracing::{debug, trace};

/// Parent relationship of documents with a parent field
///
/// On persist, a parent document set by the caller decides the parent node
/// unless a filing listener already chose one, and a node whose parent
/// changed is moved. On hydrate, the parent is mapped as a proxy when the
/// parent node is referenceable and holds a document.
#[derive(Debug, Default)]
pub struct ParentSubscriber;

impl ParentSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_parent_from_document(event: &mut PersistEvent) -> Result<()> {
        if event.has_parent_node() {
            return Ok(());
        }
        let parent = match event.document()?.raw_mut()?.parent_behavior() {
            Some(behavior) => behavior.parent().cloned(),
            None => return Ok(()),
        };
        if let Some(parent) = parent {
            let node = event.context()?.registry().node_for_document(&parent)?;
            event.set_parent_node(node);
        }
        Ok(())
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?.clone();
        if document.raw_mut()?.parent_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let node = event.node()?;
        let session = context.session();
        if session.depth(node)? == 0 {
            return Err(DocumentManagerError::runtime(format!(
                "Cannot apply parent behavior to root node \"{}\" with type \"{}\" for document of class \"{}\"",
                session.path(node)?,
                NT_UNSTRUCTURED,
                document.type_name()
            )));
        }
        Self::map_parent(&context, &document, node, event.options())
    }

    fn handle_change_parent(event: &mut PersistEvent) -> Result<()> {
        if !event.has_parent_node() {
            return Ok(());
        }
        let context = event.context()?;
        let session = context.session();
        let parent_node = event.parent_node()?;
        if session.parent(event.node()?)? == parent_node {
            return Ok(());
        }

        let parent_path = session.path(parent_node)?;
        debug!("Parent of {} changed, moving to {}", session.path(event.node()?)?, parent_path);
        let mut move_event = MoveEvent::new(event.document()?.clone(), parent_path);
        context.dispatch(&mut move_event)
    }

    fn handle_move(event: &mut MoveEvent) -> Result<()> {
        let document = event.document().clone();
        if document.raw_mut()?.parent_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let node = context.registry().node_for_document(&document)?;
        Self::map_parent(&context, &document, node, &Options::new())
    }

    fn map_parent(
        context: &DocumentManagerContext,
        document: &DocumentRef,
        node: NodeId,
        options: &Options,
    ) -> Result<()> {
        let session = context.session();
        let parent_node = session.parent(node)?;
        if session.identifier(parent_node)?.is_none() {
            return Ok(());
        }
        // untyped folders, e.g. created by filing, have no document
        if !context.registry().has_node(parent_node)
            && context
                .strategy()
                .resolve_metadata_for_node(session.as_ref(), parent_node)?
                .is_none()
        {
            trace!("Parent {} of {} has no document type", parent_node, node);
            return Ok(());
        }

        let parent = context
            .proxy_factory()
            .create_proxy_for_node(document, parent_node, options)?;
        if let Some(behavior) = document.raw_mut()?.parent_behavior() {
            behavior.set_parent(Some(parent));
        }
        Ok(())
    }
}

impl EventSubscriber for ParentSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::ParentFromDocument,
            "parent.parent_from_document",
            Self::handle_parent_from_document,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "parent.hydrate",
            Self::handle_hydrate,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "parent.change_parent",
            Self::handle_change_parent,
        );
        dispatcher.add_listener::<MoveEvent>(MoveStage::Remap, "parent.move", Self::handle_move);
    }
}
