use crate::context::DocumentManagerContext;
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    ConfigureOptionsEvent, CopyEvent, Event, EventDispatcher, EventSubscriber, MoveEvent,
    MoveStage, OptionType, PersistEvent, PersistStage, Stage,
};
use crate::subscribers::event_locale;
use serde_json::json;
use std::rc::Rc;
use tracing::debug;

/// Names nodes after the slugified title of their document
///
/// New documents get a node named after their title, suffixed when the name
/// is taken. Existing nodes are renamed when the title changes, but only
/// when persisting in the default locale, so translations never rename the
/// shared node. Moves and copies resolve a free name below the destination.
#[derive(Debug, Default)]
pub struct AutoNameSubscriber;

impl AutoNameSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != PersistEvent::NAME {
            return Ok(());
        }
        event
            .schema_mut()
            .set_default("auto_name", json!(true))
            .set_allowed_types("auto_name", &[OptionType::Bool]);
        Ok(())
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        if event.option("auto_name").and_then(|value| value.as_bool()) == Some(false) {
            return Ok(());
        }
        let document = event.document()?.clone();
        let mut raw = document.raw_mut()?;
        let title = match raw.auto_name_behavior() {
            Some(behavior) => behavior.title().map(str::to_string),
            None => return Ok(()),
        };
        drop(raw);
        let title = title.filter(|title| !title.trim().is_empty()).ok_or_else(|| {
            DocumentManagerError::general(format!(
                "Document has no title (title is required for auto name behavior): {}",
                document.type_name()
            ))
        })?;

        let context = event.context()?;
        let session = context.session();
        let node = if event.has_node() {
            Some(event.node()?)
        } else {
            None
        };
        let parent = match (event.has_parent_node(), node) {
            (true, _) => event.parent_node()?,
            (false, Some(node)) => session.parent(node)?,
            (false, None) => event.parent_node()?,
        };

        let slug = context.slugifier().slugify(&title);
        let name = context
            .name_resolver()
            .resolve_name(session.as_ref(), parent, &slug, node)?;

        let node = match node {
            Some(node) => node,
            None => {
                let node = context.strategy().create_node_for_document(
                    session.as_ref(),
                    &document,
                    parent,
                    &name,
                )?;
                event.set_node(node);
                return Ok(());
            }
        };

        if session.name(node)? == name {
            return Ok(());
        }
        let locale = event_locale(event)?;
        if locale != context.registry().default_locale() {
            debug!("Not renaming {} while persisting locale {}", node, locale);
            return Ok(());
        }
        debug!("Renaming {} to {}", session.path(node)?, name);
        session.rename(node, &name)?;
        Ok(())
    }

    fn handle_move(event: &mut MoveEvent) -> Result<()> {
        let context = event.context()?;
        let name = Self::resolve_destination_name(&context, event.document(), event.dest_id(), true)?;
        if let Some(name) = name {
            event.set_dest_name(name);
        }
        Ok(())
    }

    fn handle_copy(event: &mut CopyEvent) -> Result<()> {
        let context = event.context()?;
        let name =
            Self::resolve_destination_name(&context, event.document(), event.dest_path(), false)?;
        if let Some(name) = name {
            event.set_dest_name(name);
        }
        Ok(())
    }

    /// Free name for the document's node below `destination`
    ///
    /// A moved node keeps its name when it stays below the same parent.
    fn resolve_destination_name(
        context: &DocumentManagerContext,
        document: &DocumentRef,
        destination: &str,
        is_move: bool,
    ) -> Result<Option<String>> {
        if document.raw_mut()?.auto_name_behavior().is_none() {
            return Ok(None);
        }
        let session = context.session();
        let node = context.registry().node_for_document(document)?;
        let destination = context.node_manager().find(destination)?;
        let name = session.name(node)?;
        let resolved = context
            .name_resolver()
            .resolve_name(session.as_ref(), destination, &name, is_move.then_some(node))?;
        Ok(Some(resolved))
    }
}

impl EventSubscriber for AutoNameSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "auto_name.configure_options",
            Self::configure_options,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::AutoName,
            "auto_name.persist",
            Self::handle_persist,
        );
        dispatcher.add_listener::<MoveEvent>(
            MoveStage::ResolveName,
            "auto_name.move",
            Self::handle_move,
        );
        dispatcher.add_listener::<CopyEvent>(
            MoveStage::ResolveName,
            "auto_name.copy",
            Self::handle_copy,
        );
    }
}
