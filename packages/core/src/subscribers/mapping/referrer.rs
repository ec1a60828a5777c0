use crate::error::Result;
use crate::events::{Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage};
use std::rc::Rc;

/// Maps a lazy collection of the documents referencing this one
#[derive(Debug, Default)]
pub struct ReferrerSubscriber;

impl ReferrerSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.referrer_behavior().is_none() {
            return Ok(());
        }
        let referrers = event
            .context()?
            .proxy_factory()
            .create_referrer_collection(document)?;
        if let Some(behavior) = document.raw_mut()?.referrer_behavior() {
            behavior.set_referrers(referrers);
        }
        Ok(())
    }
}

impl EventSubscriber for ReferrerSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "referrer.hydrate",
            Self::handle_hydrate,
        );
    }
}
