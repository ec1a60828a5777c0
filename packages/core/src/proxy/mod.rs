//! Lazy stand-ins for related documents
//!
//! [`ProxyFactory`] hands out documents for nodes reached through a
//! relationship (parent, reference field) without hydrating them, and lazy
//! collections over children, referrers and query results. A proxy is a
//! [`DocumentRef::lazy`] handle registered for its node right away, so the
//! identity map already returns it; its first checked access dispatches one
//! HYDRATE into the same instance.

mod collection;

pub use collection::{
    ChildrenCollection, CollectionIter, LazyCollection, QueryResultCollection, ReferrerCollection,
};

use crate::context::DocumentManagerContext;
use crate::document::{DocumentRef, Initializer};
use crate::error::{DocumentManagerError, Result};
use crate::events::{HydrateEvent, Options};
use crate::session::{NodeId, Row};
use std::rc::{Rc, Weak};
use tracing::trace;

/// Creates proxies and lazy collections for one document manager
pub struct ProxyFactory {
    context: Weak<DocumentManagerContext>,
}

impl ProxyFactory {
    pub fn new(context: Weak<DocumentManagerContext>) -> Self {
        Self { context }
    }

    /// Document for `target`, reached from `from_document`
    ///
    /// A registered node returns its document, hydrated again when it was
    /// last hydrated in another locale than `from_document`. Otherwise a
    /// lazy proxy of the node's document type is registered and returned.
    pub fn create_proxy_for_node(
        &self,
        from_document: &DocumentRef,
        target: NodeId,
        options: &Options,
    ) -> Result<DocumentRef> {
        let context = self.context()?;
        let registry = context.registry();
        let locale = registry.original_locale_for_document(from_document);

        if registry.has_node(target) {
            let document = registry.document_for_node(target)?;
            if registry.original_locale_for_document(&document) != locale {
                let mut event =
                    HydrateEvent::new(target, locale, Options::new()).with_document(document.clone());
                context.dispatch(&mut event)?;
            }
            return Ok(document);
        }

        let session = context.session();
        let metadata = context
            .strategy()
            .resolve_metadata_for_node(session.as_ref(), target)?
            .ok_or_else(|| {
                DocumentManagerError::metadata_not_found(format!(
                    "No metadata found for node \"{}\"",
                    session.path(target).unwrap_or_else(|_| target.to_string())
                ))
            })?;

        let initializer = self.initializer(from_document, target, locale.clone(), options.clone());
        let proxy = DocumentRef::lazy(metadata.new_instance(), initializer);
        registry.register_document(&proxy, target, locale.as_deref())?;
        trace!("Created proxy {} for node {}", metadata.alias(), target);
        Ok(proxy)
    }

    /// Children of `document`'s node, hydrated in its original locale
    pub fn create_children_collection(
        &self,
        document: &DocumentRef,
        options: &Options,
    ) -> Result<ChildrenCollection> {
        let context = self.context()?;
        let node = context.registry().node_for_document(document)?;
        let locale = context.registry().original_locale_for_document(document);

        Ok(ChildrenCollection::from_lazy(LazyCollection::new(
            self.context.clone(),
            locale,
            options.clone(),
            move |session| Ok(session.children(node)?),
        )))
    }

    /// Nodes holding a reference to `document`'s node, each listed once
    pub fn create_referrer_collection(&self, document: &DocumentRef) -> Result<ReferrerCollection> {
        let context = self.context()?;
        let node = context.registry().node_for_document(document)?;
        let locale = context.registry().original_locale_for_document(document);

        Ok(ReferrerCollection::from_lazy(LazyCollection::new(
            self.context.clone(),
            locale,
            Options::new(),
            move |session| {
                let mut referrers: Vec<NodeId> = Vec::new();
                for reference in session.references(node)? {
                    if !referrers.contains(&reference.node) {
                        referrers.push(reference.node);
                    }
                }
                Ok(referrers)
            },
        )))
    }

    /// Documents for the nodes of query result rows
    pub fn create_query_result_collection(
        &self,
        rows: Vec<Row>,
        locale: Option<String>,
        options: Options,
    ) -> QueryResultCollection {
        let nodes: Vec<NodeId> = rows.into_iter().map(|row| row.node).collect();
        QueryResultCollection::from_lazy(LazyCollection::new(
            self.context.clone(),
            locale,
            options,
            move |_| Ok(nodes.clone()),
        ))
    }

    fn initializer(
        &self,
        from_document: &DocumentRef,
        target: NodeId,
        locale: Option<String>,
        options: Options,
    ) -> Initializer {
        let context = self.context.clone();
        let from_document = from_document.downgrade();

        Rc::new(move |proxy: &DocumentRef| {
            let context = context.upgrade().ok_or_else(|| {
                DocumentManagerError::runtime("The document manager owning this proxy has been dropped")
            })?;
            let locale = from_document
                .upgrade()
                .and_then(|from| context.registry().original_locale_for_document(&from))
                .or_else(|| locale.clone());

            let mut event =
                HydrateEvent::new(target, locale, options.clone()).with_document(proxy.clone());
            context.dispatch(&mut event)
        })
    }

    fn context(&self) -> Result<Rc<DocumentManagerContext>> {
        self.context
            .upgrade()
            .ok_or_else(|| DocumentManagerError::runtime("The document manager has been dropped"))
    }
}
