//! Typed, staged event dispatcher
//!
//! Each event type is its own channel. Listeners are registered against a
//! stage of that channel and run in ascending stage order, ties broken by
//! registration order. Any listener may stop propagation; the remaining
//! listeners of that dispatch are skipped. The first error aborts the
//! dispatch and is returned unchanged.
//!
//! Dispatch works on a snapshot of the listener list, so listeners may
//! dispatch further events (hydrating a parent while hydrating a child) or
//! register listeners without deadlocking the dispatcher.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::events::{EventDispatcher, FlushEvent, FlushStage};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.add_listener::<FlushEvent>(FlushStage::Save, "noop", |_event| Ok(()));
//! assert_eq!(dispatcher.listener_count::<FlushEvent>(), 1);
//! ```

use super::Event;
use crate::error::Result;
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

type Handler<E> = Rc<dyn Fn(&mut E) -> Result<()>>;

struct Listener<E: Event> {
    stage: E::Stage,
    sequence: u64,
    name: &'static str,
    handler: Handler<E>,
}

impl<E: Event> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage,
            sequence: self.sequence,
            name: self.name,
            handler: Rc::clone(&self.handler),
        }
    }
}

/// Registers listeners on an [`EventDispatcher`]
pub trait EventSubscriber {
    fn subscribe(self: Rc<Self>, dispatcher: &EventDispatcher);
}

/// Synchronous dispatcher owned by one document manager
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RefCell<HashMap<TypeId, Box<dyn Any>>>,
    sequence: Cell<u64>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E` at `stage`
    ///
    /// `name` identifies the listener in traces.
    pub fn add_listener<E: Event>(
        &self,
        stage: E::Stage,
        name: &'static str,
        handler: impl Fn(&mut E) -> Result<()> + 'static,
    ) {
        let sequence = self.sequence.get();
        self.sequence.set(sequence + 1);

        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<Listener<E>>::new()));
        if let Some(channel) = entry.downcast_mut::<Vec<Listener<E>>>() {
            channel.push(Listener {
                stage,
                sequence,
                name,
                handler: Rc::new(handler),
            });
            channel.sort_by(|a, b| a.stage.cmp(&b.stage).then(a.sequence.cmp(&b.sequence)));
        }
    }

    pub fn add_subscriber<S: EventSubscriber + 'static>(&self, subscriber: Rc<S>) {
        subscriber.subscribe(self);
    }

    /// Run every listener of `E` against `event`
    pub fn dispatch<E: Event>(&self, event: &mut E) -> Result<()> {
        let listeners = self.snapshot::<E>();
        trace!("Dispatching {} to {} listeners", E::NAME, listeners.len());

        for listener in listeners {
            if event.base().is_propagation_stopped() {
                debug!(
                    "Propagation of {} stopped before {} ({:?})",
                    E::NAME,
                    listener.name,
                    listener.stage
                );
                break;
            }
            trace!("{} -> {} ({:?})", E::NAME, listener.name, listener.stage);
            (listener.handler)(event)?;
        }
        Ok(())
    }

    pub fn listener_count<E: Event>(&self) -> usize {
        self.snapshot::<E>().len()
    }

    /// Listener names with their stages, in execution order
    pub fn listeners<E: Event>(&self) -> Vec<(E::Stage, &'static str)> {
        self.snapshot::<E>()
            .into_iter()
            .map(|listener| (listener.stage, listener.name))
            .collect()
    }

    fn snapshot<E: Event>(&self) -> Vec<Listener<E>> {
        self.listeners
            .borrow()
            .get(&TypeId::of::<E>())
            .and_then(|entry| entry.downcast_ref::<Vec<Listener<E>>>())
            .cloned()
            .unwrap_or_default()
    }
}
