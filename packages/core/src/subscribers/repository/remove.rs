use crate::error::{DocumentManagerError, Result};
use crate::events::{Event, EventDispatcher, EventSubscriber, RemoveEvent, RemoveStage};
use std::rc::Rc;
use tracing::debug;

/// Removes the node of a document unless other nodes still reference it
#[derive(Debug, Default)]
pub struct RemoveSubscriber;

impl RemoveSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_remove(event: &mut RemoveEvent) -> Result<()> {
        let context = event.context()?;
        let session = context.session();
        let node = context.registry().node_for_document(event.document())?;

        let references = session.references(node)?;
        if !references.is_empty() {
            return Err(DocumentManagerError::DocumentReferenced {
                path: session.path(node)?,
                references: references.into_iter().map(|reference| reference.path).collect(),
            });
        }

        debug!("Removing node {}", session.path(node)?);
        session.remove(node)?;
        Ok(())
    }
}

impl EventSubscriber for RemoveSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<RemoveEvent>(RemoveStage::Remove, "remove.remove", Self::handle_remove);
    }
}
