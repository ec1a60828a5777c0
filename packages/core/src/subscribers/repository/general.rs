use crate::error::Result;
use crate::events::{
    ClearEvent, CopyEvent, Event, EventDispatcher, EventSubscriber, FlushEvent, FlushStage,
    HydrateEvent, MoveEvent, MoveStage, Options, RefreshEvent, Stage,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

/// Move, copy, refresh, flush and clear against the node manager
#[derive(Debug, Default)]
pub struct GeneralSubscriber;

impl GeneralSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_move(event: &mut MoveEvent) -> Result<()> {
        let context = event.context()?;
        let session = context.session();
        let node = context.registry().node_for_document(event.document())?;

        let name = match event.dest_name() {
            Some(name) => name.to_string(),
            None => session.name(node)?,
        };
        let path = session.path(node)?;
        context.node_manager().move_node(&path, event.dest_id(), &name)?;
        Ok(())
    }

    fn handle_copy(event: &mut CopyEvent) -> Result<()> {
        let context = event.context()?;
        let session = context.session();
        let node = context.registry().node_for_document(event.document())?;

        let name = match event.dest_name() {
            Some(name) => name.to_string(),
            None => session.name(node)?,
        };
        let path = session.path(node)?;
        let copied_path = context.node_manager().copy(&path, event.dest_path(), &name)?;
        let copied_node = session.node_by_path(&copied_path)?;
        event.set_copied(copied_path, copied_node);
        Ok(())
    }

    fn handle_refresh(event: &mut RefreshEvent) -> Result<()> {
        let context = event.context()?;
        let registry = context.registry();
        let document = event.document().clone();
        let node = registry.node_for_document(&document)?;

        debug!("Refreshing {} from node {}", document.type_name(), node);
        context.session().revert(node)?;

        // same document, same locale: only a forced rehydration remaps it
        let mut options = Options::new();
        options.insert("rehydrate".to_string(), Value::Bool(true));
        let mut hydrate = HydrateEvent::new(node, registry.locale_for_document(&document), options)
            .with_document(document);
        context.dispatch(&mut hydrate)
    }

    fn handle_flush(event: &mut FlushEvent) -> Result<()> {
        event.context()?.node_manager().save()
    }

    fn handle_clear(event: &mut ClearEvent) -> Result<()> {
        event.context()?.node_manager().clear()
    }
}

impl EventSubscriber for GeneralSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<MoveEvent>(MoveStage::Apply, "general.move", Self::handle_move);
        dispatcher.add_listener::<CopyEvent>(MoveStage::Apply, "general.copy", Self::handle_copy);
        dispatcher.add_listener::<RefreshEvent>(Stage::Handle, "general.refresh", Self::handle_refresh);
        dispatcher.add_listener::<FlushEvent>(FlushStage::Save, "general.flush", Self::handle_flush);
        dispatcher.add_listener::<ClearEvent>(Stage::Handle, "general.clear", Self::handle_clear);
    }
}
