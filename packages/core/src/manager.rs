//! Document Manager
//!
//! The façade an application talks to. Every operation validates its
//! options, dispatches one event through the manager's pipeline and
//! returns the event's result. The façade itself holds no mapping logic;
//! subscribers registered on the dispatcher do all the work.
//!
//! # Options
//!
//! Each channel accepting options declares them once, the first time the
//! channel is used, by dispatching a CONFIGURE_OPTIONS event to every
//! subscriber. Unknown options, options of the wrong type and conflicting
//! options are rejected before the operation's event is dispatched.
//!
//! # Errors
//!
//! Errors are wrapped in [`DocumentManagerError::Named`] carrying the
//! manager name. Repository errors and errors that were already named by
//! another manager are first nested in a general error describing the
//! failed operation.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::config::DocumentManagerConfig;
//! use docmapper_core::document::Document;
//! use docmapper_core::document_fields;
//! use docmapper_core::manager::DocumentManager;
//! use docmapper_core::metadata::{MappingOptions, Metadata, MetadataFactory};
//! use docmapper_core::session::InMemorySession;
//! use serde_json::json;
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Page {
//!     title: Option<String>,
//! }
//!
//! impl Document for Page {
//!     document_fields!(title);
//! }
//!
//! let factory = MetadataFactory::from_metadata([
//!     Metadata::for_document::<Page>("page", "app:page").with_field("title", MappingOptions::new()),
//! ])
//! .unwrap();
//! let manager = DocumentManager::new(
//!     DocumentManagerConfig::default(),
//!     Rc::new(InMemorySession::new()),
//!     Arc::new(factory),
//! )
//! .unwrap();
//!
//! let page = manager.create("page").unwrap();
//! page.write(|p: &mut Page| p.title = Some("Home".into())).unwrap();
//!
//! let mut options = serde_json::Map::new();
//! options.insert("path".to_string(), json!("/home"));
//! manager.persist(&page, None, options).unwrap();
//! manager.flush().unwrap();
//!
//! let found = manager.find("/home", None, Default::default()).unwrap();
//! assert!(found.ptr_eq(&page));
//! ```

use crate::config::DocumentManagerConfig;
use crate::context::DocumentManagerContext;
use crate::document::DocumentRef;
use crate::error::{DocumentManagerError, Result};
use crate::events::{
    ClearEvent, ConfigureOptionsEvent, CopyEvent, CreateEvent, Event, EventDispatcher, FindEvent,
    FlushEvent, MoveEvent, OptionType, Options, OptionsExt, OptionsSchema, PersistEvent, PublishEvent,
    QueryCreateBuilderEvent, QueryCreateEvent, RefreshEvent, RemoveDraftEvent, RemoveEvent,
    ReorderEvent, RestoreEvent, UnpublishEvent,
};
use crate::metadata::MetadataFactory;
use crate::models::time::{SystemTimeProvider, TimeProvider};
use crate::query::{Query, QueryBuilder, QueryInput};
use crate::session::Session;
use crate::slugifier::{DefaultSlugifier, Slugifier};
use crate::strategy::{DocumentStrategy, MixinStrategy};
use crate::subscribers::register_default_subscribers;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

type SubscriberRegistration = Box<dyn FnOnce(&EventDispatcher)>;

/// Assembles a [`DocumentManager`]
///
/// Defaults: [`MixinStrategy`], [`DefaultSlugifier`], [`SystemTimeProvider`]
/// and the default subscribers.
pub struct DocumentManagerBuilder {
    config: DocumentManagerConfig,
    session: Rc<dyn Session>,
    metadata_factory: Arc<MetadataFactory>,
    strategy: Option<Rc<dyn DocumentStrategy>>,
    slugifier: Option<Rc<dyn Slugifier>>,
    time: Option<Arc<dyn TimeProvider>>,
    registrations: Vec<SubscriberRegistration>,
    default_subscribers: bool,
}

impl DocumentManagerBuilder {
    pub fn new(
        config: DocumentManagerConfig,
        session: Rc<dyn Session>,
        metadata_factory: Arc<MetadataFactory>,
    ) -> Self {
        Self {
            config,
            session,
            metadata_factory,
            strategy: None,
            slugifier: None,
            time: None,
            registrations: Vec::new(),
            default_subscribers: true,
        }
    }

    pub fn strategy(mut self, strategy: Rc<dyn DocumentStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn slugifier(mut self, slugifier: Rc<dyn Slugifier>) -> Self {
        self.slugifier = Some(slugifier);
        self
    }

    pub fn time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = Some(time);
        self
    }

    /// Register additional listeners after the default subscribers
    pub fn with_subscribers(mut self, register: impl FnOnce(&EventDispatcher) + 'static) -> Self {
        self.registrations.push(Box::new(register));
        self
    }

    /// Start from an empty pipeline
    pub fn without_default_subscribers(mut self) -> Self {
        self.default_subscribers = false;
        self
    }

    /// # Errors
    ///
    /// `InvalidArgument` when the configuration is invalid.
    pub fn build(self) -> Result<DocumentManager> {
        self.config.validate().map_err(|reason| {
            DocumentManagerError::invalid_argument(format!(
                "Invalid configuration for document manager \"{}\": {}",
                self.config.name, reason
            ))
        })?;

        let strategy = self
            .strategy
            .unwrap_or_else(|| Rc::new(MixinStrategy::new(Arc::clone(&self.metadata_factory))));
        let slugifier = self.slugifier.unwrap_or_else(|| Rc::new(DefaultSlugifier));
        let time = self.time.unwrap_or_else(|| Arc::new(SystemTimeProvider));

        let name = self.config.name.clone();
        let context = DocumentManagerContext::new(
            self.config,
            self.session,
            self.metadata_factory,
            strategy,
            slugifier,
            time,
        );

        if self.default_subscribers {
            register_default_subscribers(context.dispatcher());
        }
        for register in self.registrations {
            register(context.dispatcher());
        }

        info!("Document manager \"{}\" ready", name);
        Ok(DocumentManager {
            context,
            schemas: RefCell::new(HashMap::new()),
        })
    }
}

/// Maps documents to and from one repository session
pub struct DocumentManager {
    context: Rc<DocumentManagerContext>,
    schemas: RefCell<HashMap<&'static str, OptionsSchema>>,
}

impl DocumentManager {
    /// Manager with the default collaborators and subscribers
    pub fn new(
        config: DocumentManagerConfig,
        session: Rc<dyn Session>,
        metadata_factory: Arc<MetadataFactory>,
    ) -> Result<Self> {
        DocumentManagerBuilder::new(config, session, metadata_factory).build()
    }

    pub fn builder(
        config: DocumentManagerConfig,
        session: Rc<dyn Session>,
        metadata_factory: Arc<MetadataFactory>,
    ) -> DocumentManagerBuilder {
        DocumentManagerBuilder::new(config, session, metadata_factory)
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn context(&self) -> &Rc<DocumentManagerContext> {
        &self.context
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        self.context.dispatcher()
    }

    /// Find the document at a path or with a UUID
    ///
    /// Options: `type` (alias or class the document must have),
    /// `rehydrate` (map the node again even when already hydrated).
    pub fn find(&self, identifier: &str, locale: Option<&str>, options: Options) -> Result<DocumentRef> {
        self.run(&format!("finding document \"{}\"", identifier), || {
            let options = self.resolve_options::<FindEvent>(options)?;
            let locale = requested_locale(locale, &options);
            let mut event = FindEvent::new(identifier, locale, options);
            self.context.dispatch(&mut event)?;
            event.into_document()
        })
    }

    /// A new, unpersisted document for `alias`
    pub fn create(&self, alias: &str) -> Result<DocumentRef> {
        self.run(&format!("creating document \"{}\"", alias), || {
            let mut event = CreateEvent::new(alias);
            self.context.dispatch(&mut event)?;
            event.into_document()
        })
    }

    /// Write a document to its node, creating the node when needed
    ///
    /// Options: `path`, `parent_path`, `node_name`, `auto_create`,
    /// `auto_name`, `user`.
    pub fn persist(&self, document: &DocumentRef, locale: Option<&str>, options: Options) -> Result<()> {
        self.run(&format!("persisting document \"{}\"", document.type_name()), || {
            let options = self.resolve_options::<PersistEvent>(options)?;
            document.initialize()?;
            let locale = requested_locale(locale, &options);
            let mut event = PersistEvent::new(document.clone(), locale, options);
            self.context.dispatch(&mut event)
        })
    }

    /// Remove the document's node
    ///
    /// # Errors
    ///
    /// `DocumentReferenced` while other nodes reference it.
    pub fn remove(&self, document: &DocumentRef) -> Result<()> {
        self.run(&format!("removing document \"{}\"", document.type_name()), || {
            let mut event = RemoveEvent::new(document.clone());
            self.context.dispatch(&mut event)
        })
    }

    /// Move the document below the node at a path or with a UUID
    pub fn move_document(&self, document: &DocumentRef, dest_id: &str) -> Result<()> {
        self.run(&format!("moving document to \"{}\"", dest_id), || {
            let mut event = MoveEvent::new(document.clone(), dest_id);
            self.context.dispatch(&mut event)
        })
    }

    /// Copy the document below `dest_path`, returning the path of the copy
    pub fn copy(&self, document: &DocumentRef, dest_path: &str) -> Result<String> {
        self.run(&format!("copying document to \"{}\"", dest_path), || {
            let mut event = CopyEvent::new(document.clone(), dest_path);
            self.context.dispatch(&mut event)?;
            Ok(event.copied_path()?.to_string())
        })
    }

    /// Place the document before (or `after`) the sibling `dest_id`, or last
    pub fn reorder(&self, document: &DocumentRef, dest_id: Option<&str>, after: bool) -> Result<()> {
        self.run("reordering document", || {
            let mut event = ReorderEvent::new(document.clone(), dest_id.map(str::to_string), after);
            self.context.dispatch(&mut event)
        })
    }

    /// Discard unsaved node changes and map the node onto the document again
    pub fn refresh(&self, document: &DocumentRef) -> Result<()> {
        self.run(&format!("refreshing document \"{}\"", document.type_name()), || {
            let mut event = RefreshEvent::new(document.clone());
            self.context.dispatch(&mut event)
        })
    }

    /// Save the session and apply pending version operations
    pub fn flush(&self) -> Result<()> {
        self.run("flushing", || {
            let mut event = FlushEvent::new();
            self.context.dispatch(&mut event)
        })
    }

    /// Discard unsaved changes and forget every registered document
    pub fn clear(&self) -> Result<()> {
        self.run("clearing", || {
            let mut event = ClearEvent::new();
            self.context.dispatch(&mut event)
        })
    }

    pub fn create_query(
        &self,
        input: impl Into<QueryInput>,
        locale: Option<&str>,
        options: Options,
    ) -> Result<Query> {
        self.run("creating query", || {
            let options = self.resolve_options::<QueryCreateEvent>(options)?;
            let locale = requested_locale(locale, &options);
            let mut event = QueryCreateEvent::new(input.into(), locale, options);
            self.context.dispatch(&mut event)?;
            event.into_query()
        })
    }

    pub fn create_query_builder(&self) -> Result<QueryBuilder> {
        self.run("creating query builder", || {
            let mut event = QueryCreateBuilderEvent::new();
            self.context.dispatch(&mut event)?;
            event.into_builder()
        })
    }

    /// Record a new version of the document in `locale` on the next flush
    ///
    /// Options: `user`.
    pub fn publish(&self, document: &DocumentRef, locale: &str, options: Options) -> Result<()> {
        self.run(&format!("publishing document \"{}\"", document.type_name()), || {
            let options = self.resolve_options::<PublishEvent>(options)?;
            let mut event = PublishEvent::new(document.clone(), locale, options);
            self.context.dispatch(&mut event)
        })
    }

    pub fn unpublish(&self, document: &DocumentRef, locale: &str) -> Result<()> {
        self.run(&format!("unpublishing document \"{}\"", document.type_name()), || {
            let mut event = UnpublishEvent::new(document.clone(), locale);
            self.context.dispatch(&mut event)
        })
    }

    pub fn remove_draft(&self, document: &DocumentRef, locale: &str) -> Result<()> {
        self.run(&format!("removing draft of \"{}\"", document.type_name()), || {
            let mut event = RemoveDraftEvent::new(document.clone(), locale);
            self.context.dispatch(&mut event)
        })
    }

    /// Restore the document's `locale` properties from `version`
    pub fn restore(
        &self,
        document: &DocumentRef,
        locale: &str,
        version: &str,
        options: Options,
    ) -> Result<()> {
        self.run(&format!("restoring version \"{}\"", version), || {
            let options = self.resolve_options::<RestoreEvent>(options)?;
            let mut event = RestoreEvent::new(document.clone(), locale, version, options);
            self.context.dispatch(&mut event)
        })
    }

    /// Validate `options` for the channel of `E` and add the defaults
    fn resolve_options<E: Event>(&self, options: Options) -> Result<Options> {
        if let Some(schema) = self.schemas.borrow().get(E::NAME) {
            return Ok(schema.resolve(options)?);
        }

        let mut schema = OptionsSchema::new();
        schema
            .set_default("locale", Value::Null)
            .set_allowed_types("locale", &[OptionType::Null, OptionType::String]);
        let mut event = ConfigureOptionsEvent::new(E::NAME, schema);
        self.context.dispatch(&mut event)?;

        let schema = event.into_schema();
        let resolved = schema.resolve(options)?;
        self.schemas.borrow_mut().insert(E::NAME, schema);
        Ok(resolved)
    }

    fn run<T>(&self, operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().map_err(|error| self.process_error(operation, error))
    }

    fn process_error(&self, operation: &str, error: DocumentManagerError) -> DocumentManagerError {
        debug!("[{}] Error {}: {}", self.name(), operation, error);
        let error = if error.manager_name().is_some() || !error.is_domain_error() {
            DocumentManagerError::general_with_source(format!("Error {}", operation), error)
        } else {
            error
        };
        DocumentManagerError::named(self.name(), error)
    }
}

/// Explicit locale, else the `locale` option
fn requested_locale(locale: Option<&str>, options: &Options) -> Option<String> {
    locale
        .or_else(|| options.str_option("locale"))
        .map(str::to_string)
}

impl fmt::Debug for DocumentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentManager")
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FindEvent, Stage};
    use crate::session::{InMemorySession, SessionError};
    use serde_json::json;
    use std::cell::Cell;

    fn manager(name: &str) -> DocumentManager {
        DocumentManager::new(
            DocumentManagerConfig::default().with_name(name),
            Rc::new(InMemorySession::new()),
            Arc::new(MetadataFactory::new()),
        )
        .unwrap()
    }

    // ========================================================================
    // Options
    // ========================================================================

    #[test]
    fn test_unknown_option_is_rejected_before_dispatch() {
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);
        let manager = DocumentManager::builder(
            DocumentManagerConfig::default(),
            Rc::new(InMemorySession::new()),
            Arc::new(MetadataFactory::new()),
        )
        .with_subscribers(move |dispatcher| {
            dispatcher.add_listener::<FindEvent>(Stage::Prepare, "test.reached", move |_| {
                flag.set(true);
                Ok(())
            });
        })
        .build()
        .unwrap();

        let mut options = Options::new();
        options.insert("bogus".to_string(), json!(1));
        let error = manager.find("/cmf", None, options).unwrap_err();

        assert!(!reached.get());
        assert!(matches!(error.unnamed(), DocumentManagerError::InvalidOptions(_)));
    }

    #[test]
    fn test_conflicting_persist_options() {
        let manager = manager("default");
        let mut options = Options::new();
        options.insert("path".to_string(), json!("/a"));
        options.insert("node_name".to_string(), json!("a"));

        let schema_error = manager.resolve_options::<PersistEvent>(options).unwrap_err();
        assert!(matches!(schema_error, DocumentManagerError::InvalidOptions(_)));
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let manager = manager("default");
        let options = manager.resolve_options::<PersistEvent>(Options::new()).unwrap();
        assert_eq!(options.get("auto_name"), Some(&json!(true)));
        assert_eq!(options.get("auto_create"), Some(&json!(false)));
        assert_eq!(options.get("locale"), Some(&Value::Null));

        let options = manager.resolve_options::<FindEvent>(Options::new()).unwrap();
        assert_eq!(options.get("rehydrate"), Some(&json!(false)));
        assert!(!options.contains_key("auto_name"));
    }

    // ========================================================================
    // Error naming
    // ========================================================================

    #[test]
    fn test_domain_errors_are_named_once() {
        let manager = manager("live");
        let error = manager.find("/missing", None, Options::new()).unwrap_err();

        assert_eq!(error.manager_name(), Some("live"));
        assert_eq!(
            error.to_string(),
            "[live] Could not find document with ID or path \"/missing\""
        );
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::DocumentNotFound { .. }
        ));
    }

    #[test]
    fn test_named_and_repository_errors_are_nested() {
        let manager = manager("live");

        let foreign = DocumentManagerError::named("preview", DocumentManagerError::runtime("boom"));
        let error = manager.process_error("flushing", foreign);
        assert_eq!(error.to_string(), "[live] Error flushing");
        assert!(matches!(
            error.unnamed(),
            DocumentManagerError::General { source: Some(_), .. }
        ));

        let session = DocumentManagerError::Session(SessionError::item_not_found("/x"));
        let error = manager.process_error("flushing", session);
        assert_eq!(error.to_string(), "[live] Error flushing");
    }

    #[test]
    fn test_invalid_configuration() {
        let result = DocumentManager::new(
            DocumentManagerConfig::default().with_base_path("relative"),
            Rc::new(InMemorySession::new()),
            Arc::new(MetadataFactory::new()),
        );
        assert!(matches!(result, Err(DocumentManagerError::InvalidArgument(_))));
    }
}
