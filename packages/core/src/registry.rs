//! Document identity map
//!
//! One manager owns one [`DocumentRegistry`]. It maps each node to exactly
//! one document instance and tracks, per document, the locale it currently
//! carries, the locale it was last fully hydrated in (its original locale)
//! and whether it is hydrated. It performs no I/O.
//!
//! Registering a document twice is an error; the pipeline checks
//! [`has_document`](DocumentRegistry::has_document) and
//! [`has_node`](DocumentRegistry::has_node) before registering.

use crate::document::{DocumentKey, DocumentRef};
use crate::error::{DocumentManagerError, Result};
use crate::session::NodeId;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryState {
    documents: HashMap<DocumentKey, DocumentRef>,
    nodes: HashMap<DocumentKey, NodeId>,
    documents_by_node: HashMap<NodeId, DocumentKey>,
    locales: HashMap<DocumentKey, String>,
    original_locales: HashMap<DocumentKey, String>,
    hydrated: HashSet<DocumentKey>,
}

#[derive(Debug)]
pub struct DocumentRegistry {
    default_locale: String,
    state: RefCell<RegistryState>,
}

impl DocumentRegistry {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            state: RefCell::new(RegistryState::default()),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Register `document` as the instance of `node`
    ///
    /// A missing locale registers the document in the default locale.
    ///
    /// # Errors
    ///
    /// `Runtime` when the document or the node is already registered.
    pub fn register_document(
        &self,
        document: &DocumentRef,
        node: NodeId,
        locale: Option<&str>,
    ) -> Result<()> {
        let key = document.key();
        let locale = locale.unwrap_or(&self.default_locale).to_string();
        let mut state = self.state_mut()?;

        if state.documents.contains_key(&key) {
            return Err(DocumentManagerError::runtime(format!(
                "Document \"{}\" is already registered for node \"{}\"",
                document.type_name(),
                state.nodes.get(&key).map(ToString::to_string).unwrap_or_default()
            )));
        }
        if state.documents_by_node.contains_key(&node) {
            return Err(DocumentManagerError::runtime(format!(
                "Node \"{}\" is already registered with another document",
                node
            )));
        }

        debug!("Registering {} for node {} in locale {}", document.type_name(), node, locale);
        state.documents.insert(key, document.clone());
        state.nodes.insert(key, node);
        state.documents_by_node.insert(node, key);
        state.locales.insert(key, locale.clone());
        state.original_locales.insert(key, locale);
        Ok(())
    }

    pub fn has_document(&self, document: &DocumentRef) -> bool {
        self.state()
            .map(|state| state.documents.contains_key(&document.key()))
            .unwrap_or(false)
    }

    pub fn has_node(&self, node: NodeId) -> bool {
        self.state()
            .map(|state| state.documents_by_node.contains_key(&node))
            .unwrap_or(false)
    }

    /// Whether `node` is registered with a document currently in `locale`
    pub fn has_node_in_locale(&self, node: NodeId, locale: &str) -> bool {
        self.state()
            .map(|state| {
                state
                    .documents_by_node
                    .get(&node)
                    .and_then(|key| state.locales.get(key))
                    .map_or(false, |current| current == locale)
            })
            .unwrap_or(false)
    }

    pub fn document_for_node(&self, node: NodeId) -> Result<DocumentRef> {
        let state = self.state()?;
        state
            .documents_by_node
            .get(&node)
            .and_then(|key| state.documents.get(key))
            .cloned()
            .ok_or_else(|| {
                DocumentManagerError::runtime(format!("No document is registered for node \"{}\"", node))
            })
    }

    /// # Errors
    ///
    /// `Runtime` when the document is not registered.
    pub fn node_for_document(&self, document: &DocumentRef) -> Result<NodeId> {
        self.state()?
            .nodes
            .get(&document.key())
            .copied()
            .ok_or_else(|| Self::not_registered(document))
    }

    pub fn locale_for_document(&self, document: &DocumentRef) -> Option<String> {
        self.state()
            .ok()
            .and_then(|state| state.locales.get(&document.key()).cloned())
    }

    pub fn original_locale_for_document(&self, document: &DocumentRef) -> Option<String> {
        self.state()
            .ok()
            .and_then(|state| state.original_locales.get(&document.key()).cloned())
    }

    /// Set the current locale, and the original locale when given
    pub fn update_locale(
        &self,
        document: &DocumentRef,
        locale: &str,
        original_locale: Option<&str>,
    ) -> Result<()> {
        let key = document.key();
        let mut state = self.state_mut()?;
        if !state.documents.contains_key(&key) {
            return Err(Self::not_registered(document));
        }
        state.locales.insert(key, locale.to_string());
        if let Some(original) = original_locale {
            state.original_locales.insert(key, original.to_string());
        }
        Ok(())
    }

    pub fn is_hydrated(&self, document: &DocumentRef) -> bool {
        self.state()
            .map(|state| state.hydrated.contains(&document.key()))
            .unwrap_or(false)
    }

    pub fn mark_document_as_hydrated(&self, document: &DocumentRef) -> Result<()> {
        self.state_mut()?.hydrated.insert(document.key());
        Ok(())
    }

    pub fn unmark_document_as_hydrated(&self, document: &DocumentRef) -> Result<()> {
        self.state_mut()?.hydrated.remove(&document.key());
        Ok(())
    }

    /// # Errors
    ///
    /// `Runtime` when the document is not registered.
    pub fn deregister_document(&self, document: &DocumentRef) -> Result<()> {
        let key = document.key();
        let mut state = self.state_mut()?;
        let node = state
            .nodes
            .remove(&key)
            .ok_or_else(|| Self::not_registered(document))?;

        debug!("Deregistering {} for node {}", document.type_name(), node);
        state.documents.remove(&key);
        state.documents_by_node.remove(&node);
        state.locales.remove(&key);
        state.original_locales.remove(&key);
        state.hydrated.remove(&key);
        Ok(())
    }

    /// Forget every document
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state_mut()?;
        debug!("Clearing {} registered documents", state.documents.len());
        *state = RegistryState::default();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state().map(|state| state.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> Result<Ref<'_, RegistryState>> {
        self.state
            .try_borrow()
            .map_err(|_| DocumentManagerError::runtime("Document registry is being modified"))
    }

    fn state_mut(&self) -> Result<RefMut<'_, RegistryState>> {
        self.state
            .try_borrow_mut()
            .map_err(|_| DocumentManagerError::runtime("Document registry is already borrowed"))
    }

    fn not_registered(document: &DocumentRef) -> DocumentManagerError {
        DocumentManagerError::runtime(format!(
            "Document \"{}\" is not registered",
            document.type_name()
        ))
    }
}
