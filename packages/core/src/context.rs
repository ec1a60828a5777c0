//! Per-manager collaborators
//!
//! [`DocumentManagerContext`] bundles everything one document manager owns:
//! session, dispatcher, registry, node manager, proxy factory and the
//! shared metadata. Events carry it, so subscribers reach the collaborators
//! of the manager that dispatched them and two managers never share state.

use crate::config::DocumentManagerConfig;
use crate::error::{DocumentManagerError, Result};
use crate::events::{Event, EventDispatcher};
use crate::metadata::MetadataFactory;
use crate::models::time::TimeProvider;
use crate::name_resolver::NameResolver;
use crate::node_manager::NodeManager;
use crate::property_encoder::PropertyEncoder;
use crate::proxy::ProxyFactory;
use crate::registry::DocumentRegistry;
use crate::session::Session;
use crate::slugifier::Slugifier;
use crate::strategy::DocumentStrategy;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

pub struct DocumentManagerContext {
    config: DocumentManagerConfig,
    session: Rc<dyn Session>,
    dispatcher: EventDispatcher,
    registry: DocumentRegistry,
    node_manager: NodeManager,
    proxy_factory: ProxyFactory,
    metadata_factory: Arc<MetadataFactory>,
    strategy: Rc<dyn DocumentStrategy>,
    encoder: PropertyEncoder,
    slugifier: Rc<dyn Slugifier>,
    name_resolver: NameResolver,
    time: Arc<dyn TimeProvider>,
    this: Weak<DocumentManagerContext>,
}

impl DocumentManagerContext {
    pub(crate) fn new(
        config: DocumentManagerConfig,
        session: Rc<dyn Session>,
        metadata_factory: Arc<MetadataFactory>,
        strategy: Rc<dyn DocumentStrategy>,
        slugifier: Rc<dyn Slugifier>,
        time: Arc<dyn TimeProvider>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            registry: DocumentRegistry::new(config.default_locale.clone()),
            node_manager: NodeManager::new(Rc::clone(&session)),
            proxy_factory: ProxyFactory::new(this.clone()),
            encoder: PropertyEncoder::new(config.namespaces.clone()),
            dispatcher: EventDispatcher::new(),
            name_resolver: NameResolver::new(),
            config,
            session,
            metadata_factory,
            strategy,
            slugifier,
            time,
            this: this.clone(),
        })
    }

    /// Manager name, prefixed to surfaced errors
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DocumentManagerConfig {
        &self.config
    }

    pub fn session(&self) -> &Rc<dyn Session> {
        &self.session
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn node_manager(&self) -> &NodeManager {
        &self.node_manager
    }

    pub fn proxy_factory(&self) -> &ProxyFactory {
        &self.proxy_factory
    }

    pub fn metadata_factory(&self) -> &Arc<MetadataFactory> {
        &self.metadata_factory
    }

    pub fn strategy(&self) -> &dyn DocumentStrategy {
        self.strategy.as_ref()
    }

    pub fn encoder(&self) -> &PropertyEncoder {
        &self.encoder
    }

    pub fn slugifier(&self) -> &dyn Slugifier {
        self.slugifier.as_ref()
    }

    pub fn name_resolver(&self) -> &NameResolver {
        &self.name_resolver
    }

    pub fn time(&self) -> &dyn TimeProvider {
        self.time.as_ref()
    }

    /// Shared handle to this context
    pub fn handle(&self) -> Result<Rc<Self>> {
        self.this
            .upgrade()
            .ok_or_else(|| DocumentManagerError::runtime("The document manager context has been dropped"))
    }

    /// Attach this context to `event` unless it carries one, then dispatch it
    pub fn dispatch<E: Event>(&self, event: &mut E) -> Result<()> {
        if !event.base().has_context() {
            event.base_mut().set_context(self.handle()?);
        }
        self.dispatcher.dispatch(event)
    }
}

impl fmt::Debug for DocumentManagerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentManagerContext")
            .field("name", &self.config.name)
            .field("registered_documents", &self.registry.len())
            .finish()
    }
}
