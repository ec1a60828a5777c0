use crate::error::Result;
use crate::events::{
    ConfigureOptionsEvent, Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage,
    OptionType, OptionsExt, PersistEvent, PersistStage, Stage,
};
use crate::subscribers::event_locale;
use serde_json::Value;
use std::rc::Rc;

const CREATOR: &str = "creator";
const CHANGER: &str = "changer";

/// Records the creator and last changer of documents with blame fields
///
/// The user comes from the `user` persist option; persisting without one
/// leaves both fields untouched.
#[derive(Debug, Default)]
pub struct BlameSubscriber;

impl BlameSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != PersistEvent::NAME {
            return Ok(());
        }
        event
            .schema_mut()
            .set_default("user", Value::Null)
            .set_allowed_types("user", &[OptionType::Null, OptionType::Integer]);
        Ok(())
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let user = match event.options().i64_option("user") {
            Some(user) => user,
            None => return Ok(()),
        };
        let document = event.document()?;
        let creator = {
            let mut raw = document.raw_mut()?;
            let behavior = match raw.blame_behavior() {
                Some(behavior) => behavior,
                None => return Ok(()),
            };
            if behavior.creator().is_none() {
                behavior.set_creator(Some(user));
            }
            behavior.set_changer(Some(user));
            behavior.creator()
        };

        let context = event.context()?;
        let locale = event_locale(event)?;
        let encoder = context.encoder();
        let session = context.session();
        let node = event.node()?;
        session.set_property(
            node,
            &encoder.localized_system_name(CREATOR, &locale),
            creator.map_or(Value::Null, Value::from),
        )?;
        session.set_property(
            node,
            &encoder.localized_system_name(CHANGER, &locale),
            Value::from(user),
        )?;
        Ok(())
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.blame_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let locale = event_locale(event)?;
        let encoder = context.encoder();
        let session = context.session();
        let node = event.node()?;

        let creator = session
            .property(node, &encoder.localized_system_name(CREATOR, &locale))?
            .and_then(|value| value.as_i64());
        let changer = session
            .property(node, &encoder.localized_system_name(CHANGER, &locale))?
            .and_then(|value| value.as_i64());

        if let Some(behavior) = document.raw_mut()?.blame_behavior() {
            behavior.set_creator(creator);
            behavior.set_changer(changer);
        }
        Ok(())
    }
}

impl EventSubscriber for BlameSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "blame.configure_options",
            Self::configure_options,
        );
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "blame.persist",
            Self::handle_persist,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "blame.hydrate",
            Self::handle_hydrate,
        );
    }
}
