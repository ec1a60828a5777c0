use crate::document::DocumentRef;
use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, MappingEvent,
    MoveEvent, MoveStage, PersistEvent, PersistStage, ReorderEvent, ReorderStage,
};
use crate::session::{NodeId, Session};
use std::ops::DerefMut;
use std::rc::Rc;

/// Maps the node path onto documents with a path field
///
/// Remapped after moves and reorders.
#[derive(Debug, Default)]
pub struct PathSubscriber;

impl PathSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_mapping<E>(event: &mut E) -> Result<()>
    where
        E: Event + DerefMut<Target = MappingEvent>,
    {
        let context = event.context()?;
        Self::map(context.session().as_ref(), event.document()?, event.node()?)
    }

    fn handle_move(event: &mut MoveEvent) -> Result<()> {
        let context = event.context()?;
        let document = event.document();
        let node = context.registry().node_for_document(document)?;
        Self::map(context.session().as_ref(), document, node)
    }

    fn handle_reorder(event: &mut ReorderEvent) -> Result<()> {
        let context = event.context()?;
        Self::map(context.session().as_ref(), event.document(), event.node()?)
    }

    fn map(session: &dyn Session, document: &DocumentRef, node: NodeId) -> Result<()> {
        if document.raw_mut()?.path_behavior().is_none() {
            return Ok(());
        }
        let path = session.path(node)?;
        if let Some(behavior) = document.raw_mut()?.path_behavior() {
            behavior.set_path(path);
        }
        Ok(())
    }
}

impl EventSubscriber for PathSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "path.hydrate",
            Self::handle_mapping::<HydrateEvent>,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "path.persist",
            Self::handle_mapping::<PersistEvent>,
        );
        dispatcher.add_listener::<MoveEvent>(MoveStage::Remap, "path.move", Self::handle_move);
        dispatcher.add_listener::<ReorderEvent>(
            ReorderStage::Remap,
            "path.reorder",
            Self::handle_reorder,
        );
    }
}
