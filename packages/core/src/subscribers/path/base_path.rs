use crate::error::Result;
use crate::events::{Event, EventDispatcher, EventSubscriber, PersistEvent, PersistStage};
use std::rc::Rc;

/// Files documents using base path filing below the configured base path
#[derive(Debug, Default)]
pub struct BasePathSubscriber;

impl BasePathSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        if !event.document()?.raw()?.uses_base_path() {
            return Ok(());
        }
        let context = event.context()?;
        let parent = context
            .node_manager()
            .create_path(&context.config().base_path, None)?;
        event.set_parent_node(parent);
        Ok(())
    }
}

impl EventSubscriber for BasePathSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Filing,
            "base_path.persist",
            Self::handle_persist,
        );
    }
}
