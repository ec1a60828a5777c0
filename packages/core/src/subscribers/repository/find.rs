use crate::context::DocumentManagerContext;
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    ConfigureOptionsEvent, Event, EventDispatcher, EventSubscriber, FindEvent, HydrateEvent,
    OptionType, OptionsExt, Stage,
};
use serde_json::Value;
use std::rc::Rc;

/// Resolves an identifier to a node and hydrates it
///
/// The `type` option (an alias or a class) asserts the type of the found
/// document.
#[derive(Debug, Default)]
pub struct FindSubscriber;

impl FindSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != FindEvent::NAME {
            return Ok(());
        }
        event
            .schema_mut()
            .set_default("type", Value::Null)
            .set_allowed_types("type", &[OptionType::Null, OptionType::String]);
        Ok(())
    }

    fn handle_find(event: &mut FindEvent) -> Result<()> {
        let context = event.context()?;
        let node = context.node_manager().find(event.identifier())?;

        let mut hydrate = HydrateEvent::new(
            node,
            event.locale().map(str::to_string),
            event.options().clone(),
        );
        context.dispatch(&mut hydrate)?;
        let document = hydrate.document()?.clone();

        if let Some(requested) = event.options().str_option("type") {
            Self::check_type(&context, &document, requested)?;
        }

        event.set_document(document);
        Ok(())
    }

    fn check_type(
        context: &DocumentManagerContext,
        document: &DocumentRef,
        requested: &str,
    ) -> Result<()> {
        let factory = context.metadata_factory();
        let metadata = if factory.has_alias(requested) {
            factory.metadata_for_alias(requested)?
        } else if factory.has_metadata_for_class(requested) {
            factory.metadata_for_class(requested)?
        } else {
            return Err(DocumentManagerError::invalid_argument(format!(
                "Unknown class specified and no alias exists for \"{}\", known aliases: \"{}\"",
                requested,
                factory.aliases().join("\", \"")
            )));
        };

        if document.type_name() != metadata.class() {
            return Err(DocumentManagerError::document_not_found(format!(
                "Requested document of type \"{}\" but got document of type \"{}\"",
                metadata.class(),
                document.type_name()
            )));
        }
        Ok(())
    }
}

impl EventSubscriber for FindSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "find.configure_options",
            Self::configure_options,
        );
        dispatcher.add_listener::<FindEvent>(Stage::Handle, "find.find", Self::handle_find);
    }
}
