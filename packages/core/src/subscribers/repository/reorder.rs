use crate::error::{DocumentManagerError, Result};
use crate::events::{Event, EventDispatcher, EventSubscriber, ReorderEvent, ReorderStage};
use std::rc::Rc;
use tracing::debug;

/// Places a node before (or after) one of its siblings
///
/// Without a destination the node moves to the end of its siblings.
#[derive(Debug, Default)]
pub struct ReorderSubscriber;

impl ReorderSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_reorder(event: &mut ReorderEvent) -> Result<()> {
        let context = event.context()?;
        let session = context.session();
        let node = event.node()?;
        let parent = session.parent(node)?;
        let name = session.name(node)?;

        let dest_id = match event.dest_id() {
            Some(dest_id) => dest_id.to_string(),
            None => {
                debug!("Ordering {} last", name);
                session.order_before(parent, &name, None)?;
                return Ok(());
            }
        };

        let sibling = context.node_manager().find(&dest_id)?;
        if session.parent(sibling).ok() != Some(parent) {
            return Err(DocumentManagerError::invalid_argument(format!(
                "Cannot reorder documents which are not sibilings. Trying to reorder \"{}\" to \"{}\".",
                session.path(node)?,
                session.path(sibling)?
            )));
        }
        if sibling == node {
            return Ok(());
        }
        let sibling_name = session.name(sibling)?;

        if !event.after() {
            debug!("Ordering {} before {}", name, sibling_name);
            session.order_before(parent, &name, Some(&sibling_name))?;
            return Ok(());
        }

        let names = session.child_names(parent)?;
        let next = names
            .iter()
            .position(|candidate| *candidate == sibling_name)
            .and_then(|index| names.get(index + 1));
        match next {
            // already right after the sibling
            Some(next) if *next == name => Ok(()),
            next => {
                debug!("Ordering {} after {}", name, sibling_name);
                session.order_before(parent, &name, next.map(String::as_str))?;
                Ok(())
            }
        }
    }
}

impl EventSubscriber for ReorderSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ReorderEvent>(
            ReorderStage::Apply,
            "reorder.reorder",
            Self::handle_reorder,
        );
    }
}
