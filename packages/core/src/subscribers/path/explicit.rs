use crate::context::DocumentManagerContext;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    ConfigureOptionsEvent, Event, EventDispatcher, EventSubscriber, OptionType, PersistEvent,
    PersistStage, Stage,
};
use crate::session::{parent_path, path_name, NodeId};
use serde_json::{json, Value};
use std::rc::Rc;
use tracing::debug;

/// Places documents where the persist options say
///
/// - `path`: parent path and node name in one
/// - `parent_path`: the parent, created on demand with `auto_create`
/// - `node_name`: the name below a parent given by `parent_path` or chosen
///   by an earlier listener
///
/// An existing node is moved when its parent differs, and renamed when only
/// its name does.
#[derive(Debug, Default)]
pub struct ExplicitSubscriber;

impl ExplicitSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != PersistEvent::NAME {
            return Ok(());
        }
        let string_or_null = [OptionType::Null, OptionType::String];
        event
            .schema_mut()
            .set_default("path", Value::Null)
            .set_default("node_name", Value::Null)
            .set_default("parent_path", Value::Null)
            .set_default("auto_create", json!(false))
            .set_allowed_types("path", &string_or_null)
            .set_allowed_types("node_name", &string_or_null)
            .set_allowed_types("parent_path", &string_or_null)
            .set_allowed_types("auto_create", &[OptionType::Bool])
            .set_conflicting("path", "node_name")
            .set_conflicting("path", "parent_path");
        Ok(())
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;

        let mut parent = None;
        let mut node_name = None;
        if let Some(path) = event.str_option("path") {
            parent = Some(parent_path(path).to_string());
            node_name = Some(path_name(path).to_string());
        }
        if let Some(path) = event.str_option("parent_path") {
            parent = Some(path.to_string());
        }

        if let Some(parent) = parent {
            let auto_create = event.bool_option("auto_create");
            let parent_node = if auto_create {
                context.node_manager().create_path(&parent, None)?
            } else {
                context.node_manager().find(&parent)?
            };
            event.set_parent_node(parent_node);
        }

        if let Some(name) = event.str_option("node_name") {
            if !event.has_parent_node() {
                return Err(DocumentManagerError::general(format!(
                    "The \"node_name\" option can only be used either with the \"parent_path\" option \
                     or when a parent node has been established by a previous subscriber. \
                     When persisting document: {}",
                    event.document()?.type_name()
                )));
            }
            node_name = Some(name.to_string());
        }

        let node_name = match node_name {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(()),
        };
        let parent_node = event.parent_node()?;

        if event.has_node() {
            return Self::handle_existing(&context, event.node()?, parent_node, &node_name);
        }

        let document = event.document()?.clone();
        let node = context.strategy().create_node_for_document(
            context.session().as_ref(),
            &document,
            parent_node,
            &node_name,
        )?;
        event.set_node(node);
        Ok(())
    }

    fn handle_existing(
        context: &DocumentManagerContext,
        node: NodeId,
        parent_node: NodeId,
        node_name: &str,
    ) -> Result<()> {
        let session = context.session();
        let path = session.path(node)?;
        let target_parent = session.path(parent_node)?;

        if target_parent != parent_path(&path) {
            context.node_manager().move_node(&path, &target_parent, node_name)?;
            return Ok(());
        }
        if session.name(node)? == node_name {
            return Ok(());
        }
        debug!("Renaming {} to {}", path, node_name);
        session.rename(node, node_name)?;
        Ok(())
    }
}

impl EventSubscriber for ExplicitSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "explicit.configure_options",
            Self::configure_options,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::ExplicitPath,
            "explicit.persist",
            Self::handle_persist,
        );
    }
}
