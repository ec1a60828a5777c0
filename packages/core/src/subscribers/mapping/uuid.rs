use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, MappingEvent,
    PersistEvent, PersistStage,
};
use std::ops::DerefMut;
use std::rc::Rc;

/// Maps the node identifier onto documents with a uuid
#[derive(Debug, Default)]
pub struct UuidSubscriber;

impl UuidSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_mapping<E>(event: &mut E) -> Result<()>
    where
        E: Event + DerefMut<Target = MappingEvent>,
    {
        let document = event.document()?;
        if document.raw_mut()?.uuid_behavior().is_none() {
            return Ok(());
        }
        let identifier = event.context()?.session().identifier(event.node()?)?;
        if let Some(identifier) = identifier {
            if let Some(behavior) = document.raw_mut()?.uuid_behavior() {
                behavior.set_uuid(identifier);
            }
        }
        Ok(())
    }
}

impl EventSubscriber for UuidSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "uuid.hydrate",
            Self::handle_mapping::<HydrateEvent>,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "uuid.persist",
            Self::handle_mapping::<PersistEvent>,
        );
    }
}
