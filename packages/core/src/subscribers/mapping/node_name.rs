use crate::document::DocumentRef;
use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, MappingEvent,
    MoveEvent, MoveStage, PersistEvent, PersistStage,
};
use crate::session::{NodeId, Session};
use std::ops::DerefMut;
use std::rc::Rc;

/// Maps the node name onto documents with a node name field
#[derive(Debug, Default)]
pub struct NodeNameSubscriber;

impl NodeNameSubscriber {
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

    fn map(session: &dyn Session, document: &DocumentRef, node: NodeId) -> Result<()> {
        if document.raw_mut()?.node_name_behavior().is_none() {
            return Ok(());
        }
        let name = session.name(node)?;
        if let Some(behavior) = document.raw_mut()?.node_name_behavior() {
            behavior.set_node_name(name);
        }
        Ok(())
    }
}

impl EventSubscriber for NodeNameSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "node_name.hydrate",
            Self::handle_mapping::<HydrateEvent>,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "node_name.persist",
            Self::handle_mapping::<PersistEvent>,
        );
        dispatcher.add_listener::<MoveEvent>(MoveStage::Remap, "node_name.move", Self::handle_move);
    }
}
