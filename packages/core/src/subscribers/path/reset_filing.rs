use crate::error::Result;
use crate::events::{Event, EventDispatcher, EventSubscriber, PersistEvent, PersistStage};
use std::rc::Rc;

/// Files documents below the base path even when they name a parent
///
/// Runs after the parent document has been turned into a parent node, and
/// replaces it.
#[derive(Debug, Default)]
pub struct ResetFilingPathSubscriber;

impl ResetFilingPathSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        if !event.document()?.raw()?.uses_reset_filing_path() {
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

impl EventSubscriber for ResetFilingPathSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::ResetFiling,
            "reset_filing.persist",
            Self::handle_persist,
        );
    }
}
