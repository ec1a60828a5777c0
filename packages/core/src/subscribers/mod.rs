//! Default event subscribers
//!
//! Each subscriber owns one concern and registers listeners on the channels
//! it takes part in. Together they implement the document manager's
//! behavior:
//!
//! ```text
//! identity/    identity map upkeep, instantiation
//! repository/  find, move/copy/refresh/flush/clear, remove, reorder, queries
//! path/        filing policies, explicit paths, auto naming
//! mapping/     identity fields, relationships, mapped fields
//! audit/       blame, timestamps
//! version      checkouts, checkpoints, restore
//! ```
//!
//! Listeners sharing a stage run in registration order, so the order used by
//! [`register_default_subscribers`] is part of the pipeline.

pub mod audit;
pub mod identity;
pub mod mapping;
pub mod path;
pub mod repository;
mod version;

pub use version::{PendingCheckpoint, PendingVersionOperations, VersionSubscriber, VERSIONS_PROPERTY};

use crate::error::Result;
use crate::events::{Event, EventDispatcher, MappingEvent};
use std::ops::DerefMut;
use std::rc::Rc;

/// Register every default subscriber on `dispatcher`
pub fn register_default_subscribers(dispatcher: &EventDispatcher) {
    dispatcher.add_subscriber(Rc::new(identity::RegistratorSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(identity::InstantiatorSubscriber::new()));

    dispatcher.add_subscriber(Rc::new(repository::FindSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(repository::GeneralSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(repository::RemoveSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(repository::ReorderSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(repository::QuerySubscriber::new()));

    dispatcher.add_subscriber(Rc::new(path::BasePathSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(path::ResetFilingPathSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(path::AliasFilingSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(path::ExplicitSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(path::AutoNameSubscriber::new()));

    dispatcher.add_subscriber(Rc::new(mapping::UuidSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::NodeNameSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::PathSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::LocaleSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::ParentSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::ChildrenSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::ReferrerSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(mapping::FieldSubscriber::new()));

    dispatcher.add_subscriber(Rc::new(audit::BlameSubscriber::new()));
    dispatcher.add_subscriber(Rc::new(audit::TimestampSubscriber::new()));

    dispatcher.add_subscriber(Rc::new(VersionSubscriber::new()));
}

/// Set the registered node of the event's document unless a node is set
pub(crate) fn node_from_registry<E>(event: &mut E) -> Result<()>
where
    E: Event + DerefMut<Target = MappingEvent>,
{
    if event.has_node() {
        return Ok(());
    }
    let context = event.context()?;
    let node = context.registry().node_for_document(event.document()?)?;
    event.set_node(node);
    Ok(())
}

/// Locale of a mapping event, falling back to the manager default
pub(crate) fn event_locale<E>(event: &E) -> Result<String>
where
    E: Event + std::ops::Deref<Target = MappingEvent>,
{
    match event.locale() {
        Some(locale) => Ok(locale.to_string()),
        None => Ok(event.context()?.registry().default_locale().to_string()),
    }
}
