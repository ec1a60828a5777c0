use crate::error::Result;
use crate::events::{Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage};
use std::rc::Rc;

/// Maps a lazy collection of child documents
#[derive(Debug, Default)]
pub struct ChildrenSubscriber;

impl ChildrenSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.children_behavior().is_none() {
            return Ok(());
        }
        let children = event
            .context()?
            .proxy_factory()
            .create_children_collection(document, event.options())?;
        if let Some(behavior) = document.raw_mut()?.children_behavior() {
            behavior.set_children(children);
        }
        Ok(())
    }
}

impl EventSubscriber for ChildrenSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "children.hydrate",
            Self::handle_hydrate,
        );
    }
}
