//! Event pipeline
//!
//! Every façade operation is an event dispatched through the manager's
//! [`EventDispatcher`]. Subscribers contribute independent steps to each
//! channel (locating nodes, filing, naming, field mapping, versioning), so
//! the façade itself knows nothing about document behaviors.
//!
//! All events embed an [`EventBase`] carrying the manager context and the
//! propagation flag. Document-centric events share [`MappingEvent`], which
//! holds the document, its node, the locale and the resolved options.

mod dispatcher;
mod lifecycle;
mod mapping;
pub mod options;
mod query;
mod stage;

pub use dispatcher::{EventDispatcher, EventSubscriber};
pub use lifecycle::{
    ClearEvent, ConfigureOptionsEvent, CopyEvent, CreateEvent, FindEvent, FlushEvent, MoveEvent,
    RefreshEvent, RemoveEvent, ReorderEvent,
};
pub use mapping::{
    HydrateEvent, MappingEvent, PersistEvent, PublishEvent, RemoveDraftEvent, RestoreEvent,
    UnpublishEvent,
};
pub use options::{OptionType, Options, OptionsError, OptionsExt, OptionsSchema};
pub use query::{QueryCreateBuilderEvent, QueryCreateEvent, QueryExecuteEvent};
pub use stage::{
    FlushStage, HydrateStage, MoveStage, PersistStage, PublishStage, RemoveStage, ReorderStage,
    RestoreStage, Stage,
};

use crate::context::DocumentManagerContext;
use crate::error::{DocumentManagerError, Result};
use std::fmt;
use std::rc::Rc;

/// State shared by every event
#[derive(Default)]
pub struct EventBase {
    context: Option<Rc<DocumentManagerContext>>,
    propagation_stopped: bool,
}

impl EventBase {
    pub fn new(context: Rc<DocumentManagerContext>) -> Self {
        Self {
            context: Some(context),
            propagation_stopped: false,
        }
    }

    pub fn set_context(&mut self, context: Rc<DocumentManagerContext>) {
        self.context = Some(context);
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Context of the manager dispatching the event
    ///
    /// # Errors
    ///
    /// `Runtime` when the event was built without a context.
    pub fn context(&self) -> Result<Rc<DocumentManagerContext>> {
        self.context.clone().ok_or_else(|| {
            DocumentManagerError::runtime(
                "No context has been set on the event, it must be dispatched through a document manager",
            )
        })
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Debug for EventBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBase")
            .field("has_context", &self.has_context())
            .field("propagation_stopped", &self.propagation_stopped)
            .finish()
    }
}

/// A dispatchable event; each implementor is its own channel
pub trait Event: 'static {
    /// Ordering of the channel's listeners
    type Stage: Copy + Ord + fmt::Debug + 'static;

    /// Channel name used in traces
    const NAME: &'static str;

    fn base(&self) -> &EventBase;

    fn base_mut(&mut self) -> &mut EventBase;

    fn context(&self) -> Result<Rc<DocumentManagerContext>> {
        self.base().context()
    }

    fn with_context(mut self, context: Rc<DocumentManagerContext>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().set_context(context);
        self
    }

    fn stop_propagation(&mut self) {
        self.base_mut().stop_propagation();
    }

    fn is_propagation_stopped(&self) -> bool {
        self.base().is_propagation_stopped()
    }
}

macro_rules! impl_event {
    ($event:ty, $stage:ty, $name:expr) => {
        impl_event!($event, $stage, $name, base);
    };
    ($event:ty, $stage:ty, $name:expr, $($field:ident).+) => {
        impl $crate::events::Event for $event {
            type Stage = $stage;
            const NAME: &'static str = $name;

            fn base(&self) -> &$crate::events::EventBase {
                &self.$($field).+
            }

            fn base_mut(&mut self) -> &mut $crate::events::EventBase {
                &mut self.$($field).+
            }
        }
    };
}

pub(crate) use impl_event;
