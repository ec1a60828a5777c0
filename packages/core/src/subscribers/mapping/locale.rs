use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, PersistEvent,
    PersistStage,
};
use crate::subscribers::event_locale;
use std::rc::Rc;

/// Maps the requested and the loaded locale onto localized documents
///
/// The locale is the one the document was asked for; the original locale is
/// the one its content was actually loaded in.
#[derive(Debug, Default)]
pub struct LocaleSubscriber;

impl LocaleSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.locale_behavior().is_none() {
            return Ok(());
        }
        let locale = event_locale(event)?;
        let original_locale = event
            .context()?
            .registry()
            .original_locale_for_document(document)
            .unwrap_or_else(|| locale.clone());

        if let Some(behavior) = document.raw_mut()?.locale_behavior() {
            behavior.set_locale(locale);
            behavior.set_original_locale(original_locale);
        }
        Ok(())
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.locale_behavior().is_none() {
            return Ok(());
        }
        let locale = event_locale(event)?;
        if let Some(behavior) = document.raw_mut()?.locale_behavior() {
            behavior.set_locale(locale);
        }
        Ok(())
    }
}

impl EventSubscriber for LocaleSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "locale.hydrate",
            Self::handle_hydrate,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "locale.persist",
            Self::handle_persist,
        );
    }
}
