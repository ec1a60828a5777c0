use crate::error::Result;
use crate::events::{
    Event, EventDispatcher, EventSubscriber, HydrateEvent, HydrateStage, PersistEvent,
    PersistStage,
};
use crate::subscribers::event_locale;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::rc::Rc;

const CREATED: &str = "created";
const CHANGED: &str = "changed";

/// Stamps creation and change times on documents with timestamp fields
#[derive(Debug, Default)]
pub struct TimestampSubscriber;

impl TimestampSubscriber {
    pub fn new() -> Self {
        Self
    }

    fn handle_persist(event: &mut PersistEvent) -> Result<()> {
        let context = event.context()?;
        let now = context.time().now();
        let document = event.document()?;
        let created = {
            let mut raw = document.raw_mut()?;
            let behavior = match raw.timestamp_behavior() {
                Some(behavior) => behavior,
                None => return Ok(()),
            };
            if behavior.created().is_none() {
                behavior.set_created(Some(now));
            }
            behavior.set_changed(Some(now));
            behavior.created().unwrap_or(now)
        };

        let locale = event_locale(event)?;
        let encoder = context.encoder();
        let session = context.session();
        let node = event.node()?;
        session.set_property(
            node,
            &encoder.localized_system_name(CREATED, &locale),
            Value::String(format_timestamp(created)),
        )?;
        session.set_property(
            node,
            &encoder.localized_system_name(CHANGED, &locale),
            Value::String(format_timestamp(now)),
        )?;
        Ok(())
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.timestamp_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let locale = event_locale(event)?;
        let encoder = context.encoder();
        let session = context.session();
        let node = event.node()?;

        let created = session
            .property(node, &encoder.localized_system_name(CREATED, &locale))?
            .as_ref()
            .and_then(parse_timestamp);
        let changed = session
            .property(node, &encoder.localized_system_name(CHANGED, &locale))?
            .as_ref()
            .and_then(parse_timestamp);

        if let Some(behavior) = document.raw_mut()?.timestamp_behavior() {
            behavior.set_created(created);
            behavior.set_changed(changed);
        }
        Ok(())
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

impl EventSubscriber for TimestampSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::Mapping,
            "timestamp.persist",
            Self::handle_persist,
        );
        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "timestamp.hydrate",
            Self::handle_hydrate,
        );
    }
}
