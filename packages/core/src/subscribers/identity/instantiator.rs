use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    CreateEvent, Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, Stage,
};
use std::rc::Rc;

/// Creates empty document instances from metadata
///
/// HYDRATE instantiates the document type stored on the node when no
/// earlier listener supplied a document. CREATE instantiates by alias.
#[derive(Debug, Default)]
pub struct InstantiatorSubscriber;

impl InstantiatorSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        if event.has_document() {
            return Ok(());
        }
        let context = event.context()?;
        let node = event.node()?;
        let session = context.session();

        let metadata = context
            .strategy()
            .resolve_metadata_for_node(session.as_ref(), node)?
            .ok_or_else(|| {
                DocumentManagerError::metadata_not_found(format!(
                    "No metadata found for node \"{}\"",
                    session.path(node).unwrap_or_else(|_| node.to_string())
                ))
            })?;
        event.set_document(DocumentRef::from_box(metadata.new_instance()));
        Ok(())
    }

    fn handle_create(event: &mut CreateEvent) -> Result<()> {
        let context = event.context()?;
        let metadata = context.metadata_factory().metadata_for_alias(event.alias())?;
        event.set_document(DocumentRef::from_box(metadata.new_instance()));
        Ok(())
    }
}

impl EventSubscriber for InstantiatorSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Instantiate,
            "instantiator.hydrate",
            Self::handle_hydrate,
        );
        dispatcher.add_listener::<CreateEvent>(Stage::Handle, "instantiator.create", Self::handle_create);
    }
}
