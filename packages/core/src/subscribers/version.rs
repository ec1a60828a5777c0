//! Versioning
//!
//! Versions are recorded in two steps. PERSIST and PUBLISH mark the nodes of
//! versionable documents and queue their checkouts; PUBLISH also queues a
//! checkpoint for its locale and user. Nothing touches the version storage
//! until FLUSH, which checks the queued nodes out, creates the checkpoints,
//! appends one history entry per checkpoint to the `sulu:versions`
//! property and saves once. Queued work follows the node, not its path, so
//! renames and moves before the flush are harmless; removed nodes and CLEAR
//! drop it.
//!
//! RESTORE replaces the localized properties of a node with those frozen in
//! a checkpoint and rehydrates the document.

use crate::error::{DocumentManagerError, Result};
use crate::events::{
    ClearEvent, ConfigureOptionsEvent, Event, EventDispatcher, EventSubscriber, FlushEvent,
    FlushStage, HydrateEvent, HydrateStage, MappingEvent, Options, OptionType, OptionsExt,
    PersistEvent, PersistStage, PublishEvent, PublishStage, RemoveEvent, RemoveStage,
    RestoreEvent, RestoreStage, Stage,
};
use crate::models::Version;
use crate::property_encoder::Encoding;
use crate::session::{NodeId, Session, SessionError, MIX_VERSIONABLE};
use crate::subscribers::event_locale;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::btree_map::{BTreeMap, Entry};
use std::ops::DerefMut;
use std::rc::Rc;
use tracing::{debug, warn};

/// Multi-valued property holding the JSON encoded version history
pub const VERSIONS_PROPERTY: &str = "sulu:versions";

/// A checkpoint queued by PUBLISH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheckpoint {
    pub node: NodeId,
    pub locale: String,
    pub author: Option<i64>,
}

/// Work queued for the next flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingVersionOperations {
    pub checkouts: Vec<NodeId>,
    pub checkpoints: Vec<PendingCheckpoint>,
}

impl PendingVersionOperations {
    pub fn is_empty(&self) -> bool {
        self.checkouts.is_empty() && self.checkpoints.is_empty()
    }

    fn add_checkout(&mut self, node: NodeId) {
        if !self.checkouts.contains(&node) {
            self.checkouts.push(node);
        }
    }

    /// Drop everything queued for `node`
    fn forget(&mut self, node: NodeId) {
        self.checkouts.retain(|queued| *queued != node);
        self.checkpoints.retain(|checkpoint| checkpoint.node != node);
    }

    fn drain(&mut self) -> Self {
        std::mem::take(self)
    }
}

#[derive(Debug, Default)]
pub struct VersionSubscriber {
    pending: RefCell<PendingVersionOperations>,
}

impl VersionSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations queued since the last flush
    pub fn pending(&self) -> PendingVersionOperations {
        self.pending.borrow().clone()
    }

    fn configure_options(event: &mut ConfigureOptionsEvent) -> Result<()> {
        if event.event_name() != PublishEvent::NAME {
            return Ok(());
        }
        event
            .schema_mut()
            .set_default("user", Value::Null)
            .set_allowed_types("user", &[OptionType::Null, OptionType::Integer]);
        Ok(())
    }

    fn handle_prepare_node<E>(&self, event: &mut E) -> Result<()>
    where
        E: Event + DerefMut<Target = MappingEvent>,
    {
        if event.document()?.raw_mut()?.version_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let session = context.session();
        let node = event.node()?;
        session.add_mixin(node, MIX_VERSIONABLE)?;
        self.pending.borrow_mut().add_checkout(node);
        Ok(())
    }

    fn handle_record_checkpoint(&self, event: &mut PublishEvent) -> Result<()> {
        if event.document()?.raw_mut()?.version_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let node = event.node()?;
        let checkpoint = PendingCheckpoint {
            node,
            locale: event_locale(event)?,
            author: event.options().i64_option("user"),
        };
        debug!(
            "Queued checkpoint of {} in {}",
            context.session().path(node)?,
            checkpoint.locale
        );
        self.pending.borrow_mut().checkpoints.push(checkpoint);
        Ok(())
    }

    /// Apply the queued work
    ///
    /// The queue is drained before anything is written; work of a failed
    /// flush is dropped.
    fn handle_flush(&self, event: &mut FlushEvent) -> Result<()> {
        let pending = self.pending.borrow_mut().drain();
        if pending.is_empty() {
            return Ok(());
        }
        let context = event.context()?;
        let session = context.session();

        for node in &pending.checkouts {
            let Some(path) = current_path(session.as_ref(), *node)? else {
                continue;
            };
            if !session.is_checked_out(&path)? {
                debug!("Checking out {}", path);
                session.checkout(&path)?;
            }
        }

        let mut histories: BTreeMap<NodeId, Vec<Value>> = BTreeMap::new();
        for checkpoint in &pending.checkpoints {
            let Some(path) = current_path(session.as_ref(), checkpoint.node)? else {
                debug!("Skipping checkpoint of removed node {}", checkpoint.node);
                continue;
            };
            let info = session.checkpoint(&path)?;

            let history = match histories.entry(checkpoint.node) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match session.property(checkpoint.node, VERSIONS_PROPERTY)? {
                    Some(Value::Array(stored)) => entry.insert(stored),
                    _ => entry.insert(Vec::new()),
                },
            };

            let version = Version::new(
                info.name,
                checkpoint.locale.clone(),
                checkpoint.author,
                Some(context.time().now()),
            );
            let entry = version.to_json().map_err(|e| {
                DocumentManagerError::runtime(format!("Could not encode version entry: {}", e))
            })?;
            history.push(Value::String(entry));
            session.set_property(checkpoint.node, VERSIONS_PROPERTY, Value::Array(history.clone()))?;
        }

        session.save()?;
        Ok(())
    }

    fn handle_remove(&self, event: &mut RemoveEvent) -> Result<()> {
        let context = event.context()?;
        let node = context.registry().node_for_document(event.document())?;
        self.pending.borrow_mut().forget(node);
        Ok(())
    }

    fn handle_clear(&self, _event: &mut ClearEvent) -> Result<()> {
        self.pending.borrow_mut().drain();
        Ok(())
    }

    fn handle_hydrate(event: &mut HydrateEvent) -> Result<()> {
        let document = event.document()?;
        if document.raw_mut()?.version_behavior().is_none() {
            return Ok(());
        }
        let context = event.context()?;
        let stored = context.session().property(event.node()?, VERSIONS_PROPERTY)?;

        let versions: Vec<Version> = match stored {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| {
                    let parsed = entry.as_str().map(Version::from_json);
                    match parsed {
                        Some(Ok(version)) => Some(version),
                        _ => {
                            warn!("Skipping invalid version entry {}", entry);
                            None
                        }
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        if let Some(behavior) = document.raw_mut()?.version_behavior() {
            behavior.set_versions(versions);
        }
        Ok(())
    }

    fn handle_restore(event: &mut RestoreEvent) -> Result<()> {
        if event.document()?.raw_mut()?.version_behavior().is_none() {
            event.stop_propagation();
            return Ok(());
        }
        let context = event.context()?;
        let session = context.session();
        let encoder = context.encoder();
        let node = event.node()?;
        let path = session.path(node)?;
        let locale = event_locale(event)?;

        let frozen = session
            .frozen_properties(&path, event.version())
            .map_err(|e| match e {
                SessionError::VersionNotFound { .. } => DocumentManagerError::version_not_found(
                    format!(
                        "Version \"{}\" for document \"{}\" with path \"{}\" not found",
                        event.version(),
                        event.document().map(|d| d.type_name()).unwrap_or_default(),
                        path
                    ),
                    Some(e),
                ),
                other => other.into(),
            })?;

        let mut live = Vec::new();
        for encoding in [Encoding::ContentLocalized, Encoding::SystemLocalized] {
            let pattern = encoder.localized_pattern(encoding, &locale)?;
            for name in session.properties(node, &pattern)?.into_keys() {
                if !live.contains(&name) {
                    live.push(name);
                }
            }
        }
        for name in &live {
            session.remove_property(node, name)?;
        }

        let prefixes = [
            encoder.localized_content_name("", &locale),
            encoder.localized_system_name("", &locale),
        ];
        for (name, value) in frozen {
            if prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())) {
                session.set_property(node, &name, value)?;
            }
        }
        debug!("Restored {} in {} from version {}", path, locale, event.version());
        Ok(())
    }

    fn handle_restore_finish(event: &mut RestoreEvent) -> Result<()> {
        let context = event.context()?;
        let mut options = Options::new();
        options.insert("rehydrate".to_string(), Value::Bool(true));
        let mut hydrate = HydrateEvent::new(event.node()?, Some(event_locale(event)?), options)
            .with_document(event.document()?.clone());
        context.dispatch(&mut hydrate)
    }
}

/// Path of `node`, or `None` once it has been removed
fn current_path(session: &dyn Session, node: NodeId) -> Result<Option<String>> {
    match session.path(node) {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl EventSubscriber for VersionSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher) {
        dispatcher.add_listener::<ConfigureOptionsEvent>(
            Stage::Handle,
            "version.configure_options",
            Self::configure_options,
        );

        let this = Rc::clone(&self);
        dispatcher.add_listener::<PersistEvent>(
            PersistStage::PrepareNode,
            "version.persist",
            move |event| this.handle_prepare_node(event),
        );
        let this = Rc::clone(&self);
        dispatcher.add_listener::<PublishEvent>(
            PublishStage::PrepareNode,
            "version.publish",
            move |event| this.handle_prepare_node(event),
        );
        let this = Rc::clone(&self);
        dispatcher.add_listener::<PublishEvent>(
            PublishStage::Record,
            "version.record_checkpoint",
            move |event| this.handle_record_checkpoint(event),
        );
        let this = Rc::clone(&self);
        dispatcher.add_listener::<FlushEvent>(
            FlushStage::ApplyVersions,
            "version.apply",
            move |event| this.handle_flush(event),
        );
        let this = Rc::clone(&self);
        dispatcher.add_listener::<RemoveEvent>(
            RemoveStage::Remove,
            "version.forget_removed",
            move |event| this.handle_remove(event),
        );
        let this = Rc::clone(&self);
        dispatcher.add_listener::<ClearEvent>(Stage::Handle, "version.clear", move |event| {
            this.handle_clear(event)
        });

        dispatcher.add_listener::<HydrateEvent>(
            HydrateStage::Mapping,
            "version.hydrate",
            Self::handle_hydrate,
        );
        dispatcher.add_listener::<RestoreEvent>(
            RestoreStage::Restore,
            "version.restore",
            Self::handle_restore,
        );
        dispatcher.add_listener::<RestoreEvent>(
            RestoreStage::Finish,
            "version.restore_finish",
            Self::handle_restore_finish,
        );
    }
}
