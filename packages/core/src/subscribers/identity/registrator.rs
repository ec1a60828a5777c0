//! Identity map upkeep
//!
//! Keeps the [`DocumentRegistry`](crate::registry::DocumentRegistry) in step
//! with the pipeline. On HYDRATE it defaults the locale, reuses the document
//! already registered for the node, and stops propagation when that
//! document is already hydrated in the requested locale (unless the
//! `rehydrate` option is set). It registers new documents, marks them
//! hydrated as the last hydrate step, unmarks them after PERSIST, and
//! forgets them on REMOVE and CLEAR.

use crate::error::Result;
use crate::events::{
    ClearEvent, ConfigureOptionsEvent, Event, EventDispatcher, EventSubscriber, FindEvent,
    HydrateEvent, HydrateStage, OptionType, PersistEvent, PersistStage, PublishEvent,
    PublishStage, RemoveDraftEvent, RemoveEvent, RemoveStage, ReorderEvent, ReorderStage,
    RestoreEvent, RestoreStage, Stage, UnpublishEvent,
};
use crate::subscribers::node_from_registry;
use serde_json::json;
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Default)]
pub struct RegistratorSubscriber;

impl RegistratorSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != FindEvent::NAME {
            return Ok(());
        }
        event
            .schema_mut()
            .set_default("rehydrate", json!(false))
            .set_allowed_types("rehydrate", &[OptionType::Bool]);
        Ok(())
    }

    fn handle_default_locale(event: &mut HydrateEvent) -> Result<()> {
        if event.locale().is_some() {
            return Ok(());
        }
        let default_locale = event.context()?.registry().default_locale().to_string();
        event.set_locale(default_locale);
        Ok(())
    }

    fn handle_document_from_registry(event: &mut HydrateEvent) -> Result<()> {
        if event.has_document() {
            return Ok(());
        }
        let context = event.context()?;
        let node = event.node()?;
        if context.registry().has_node(node) {
            event.set_document(context.registry().document_for_node(node)?);
        }
        Ok(())
    }

    fn handle_stop_propagation(event: &mut HydrateEvent) -> Result<()> {
        if !event.has_document() {
            return Ok(());
        }
        let context = event.context()?;
        let registry = context.registry();
        let document = event.document()?.clone();
        if !registry.has_document(&document) {
            return Ok(());
        }

        let locale = match event.locale() {
            Some(locale) => locale.to_string(),
            None => registry.default_locale().to_string(),
        };
        let hydrated_in_locale = registry.is_hydrated(&document)
            && registry.original_locale_for_document(&document).as_deref() == Some(locale.as_str());

        if hydrated_in_locale && !event.bool_option("rehydrate") {
            trace!("{} already hydrated in {}", document.type_name(), locale);
            event.stop_propagation();
            return Ok(());
        }

        registry.update_locale(&document, &locale, Some(&locale))
    }

    fn handle_hydrate_register(event: &mut HydrateEvent) -> Result<()> {
        let context = event.context()?;
        let registry = context.registry();
        let document = event.document()?.clone();
        let locale = match event.locale() {
            Some(locale) => locale.to_string(),
            None => registry.default_locale().to_string(),
        };

        if registry.has_document(&document) {
            return registry.update_locale(&document, &locale, None);
        }
        registry.register_document(&document, event.node()?, Some(&locale))
    }

    fn handle_mark_hydrated(event: &mut HydrateEvent) -> Result<()> {
        let context = event.context()?;
        let document = event.document()?;
        context.registry().mark_document_as_hydrated(document)?;
        document.mark_initialized();
        Ok(())
    }

    fn handle_persist_node_from_registry(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;
        let registry = context.registry();
        let document = event.document()?.clone();

        if event.locale().is_none() {
            let locale = registry
                .locale_for_document(&document)
                .unwrap_or_else(|| registry.default_locale().to_string());
            event.set_locale(locale);
        }

        if !event.has_node() && registry.has_document(&document) {
            event.set_node(registry.node_for_document(&document)?);
        }
        Ok(())
    }

    fn handle_persist_register(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;
        let registry = context.registry();
        let document = event.document()?.clone();
        let node = event.node()?;
        let locale = match event.locale() {
            Some(locale) => locale.to_string(),
            None => registry.default_locale().to_string(),
        };

        if registry.has_document(&document) {
            return registry.update_locale(&document, &locale, None);
        }
        registry.register_document(&document, node, Some(&locale))
    }

    fn handle_end_persist(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;
        context
            .registry()
            .unmark_document_as_hydrated(event.document()?)
    }

    fn handle_reorder_node(event: &mut ReorderEvent) -> Result<()> {
        if event.has_node() {
            return Ok(());
        }
        let context = event.context()?;
        let node = context.registry().node_for_document(event.document())?;
        event.set_node(node);
        Ok(())
    }

    fn handle_deregister(event: &mut RemoveEvent) -> Result<()> {
        let context = event.context()?;
        context.registry().deregister_document(event.document())
    }

    fn handle_clear(event: &mut ClearEvent) -> Result<()> {
        event.context()?.registry().clear()
    }
}

impl EventSubscriber for RegistratorSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "registrator.configure_options",
            Self::configure_options,
        );

        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::DefaultLocale,
            "registrator.default_locale",
            Self::handle_default_locale,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::ReuseFromRegistry,
            "registrator.document_from_registry",
            Self::handle_document_from_registry,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::ShortCircuit,
            "registrator.stop_propagation",
            Self::handle_stop_propagation,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Register,
            "registrator.register",
            Self::handle_hydrate_register,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::MarkHydrated,
            "registrator.mark_hydrated",
            Self::handle_mark_hydrated,
        );

        dispatcher.add_listener::<PersistEvent>(
            PersistStage::NodeFromRegistry,
            "registrator.node_from_registry",
            Self::handle_persist_node_from_registry,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Register,
            "registrator.register",
            Self::handle_persist_register,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::End,
            "registrator.end_persist",
            Self::handle_end_persist,
        );

        dispatcher.add_listener::<PublishEvent>(
            PublishStage::PrepareNode,
            "registrator.node_from_registry",
            node_from_registry::<PublishEvent>,
        );
        dispatcher.add_listener::<UnpublishEvent>(
            Stage::Prepare,
            "registrator.node_from_registry",
            node_from_registry::<UnpublishEvent>,
        );
        dispatcher.add_listener::<RemoveDraftEvent>(
            Stage::Prepare,
            "registrator.node_from_registry",
            node_from_registry::<RemoveDraftEvent>,
        );
        dispatcher.add_listener::<RestoreEvent>(
            RestoreStage::Restore,
            "registrator.node_from_registry",
            node_from_registry::<RestoreEvent>,
        );
        dispatcher.add_listener::<ReorderEvent>(
            ReorderStage::Apply,
            "registrator.node_from_registry",
            Self::handle_reorder_node,
        );

        dispatcher.add_listener::<RemoveEvent>(
            RemoveStage::Deregister,
            "registrator.deregister",
            Self::handle_deregister,
        );
        dispatcher.add_listener::<ClearEvent>(Stage::Handle, "registrator.clear", Self::handle_clear);
    }
}
