//! Shared document handles with lazy initialization
//!
//! [`DocumentRef`] is how documents travel through the mapper. Two handles
//! are the same document exactly when they point at the same allocation.
//!
//! A handle created with [`DocumentRef::lazy`] is a proxy: it holds an empty
//! instance of the right type plus an initializer. The first checked access
//! (`borrow`, `borrow_mut`, `read`, `write`) runs the initializer, which
//! hydrates the instance. State machine:
//!
//! ```text
//! Unloaded(init) ──access──▶ Loading ──ok──▶ Loaded
//!        ▲                      │
//!        └─────────error────────┘
//! ```
//!
//! Accesses made while `Loading` (the initializer hydrating the document
//! itself) go straight to the instance. Once `Loaded`, the initializer is
//! dropped, so each proxy initializes at most once.

use super::Document;
use crate::error::{DocumentManagerError, Result};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Callback hydrating a proxy on first access
pub type Initializer = Rc<dyn Fn(&DocumentRef) -> Result<()>>;

enum LazyState {
    Unloaded(Initializer),
    Loading,
    Loaded,
}

struct DocumentCell {
    state: RefCell<LazyState>,
    document: RefCell<Box<dyn Document>>,
}

/// Identity of a document, stable while any handle is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(usize);

/// Shared handle to a document
#[derive(Clone)]
pub struct DocumentRef {
    cell: Rc<DocumentCell>,
}

/// Non-owning handle, used to break cycles between proxies and their origin
#[derive(Clone)]
pub struct WeakDocumentRef {
    cell: Weak<DocumentCell>,
}

impl WeakDocumentRef {
    pub fn upgrade(&self) -> Option<DocumentRef> {
        self.cell.upgrade().map(|cell| DocumentRef { cell })
    }
}

fn borrow_conflict(type_name: &str) -> DocumentManagerError {
    DocumentManagerError::runtime(format!(
        "Document of type \"{}\" is already borrowed mutably",
        type_name
    ))
}

impl DocumentRef {
    /// Wrap a fully initialized document
    pub fn new<D: Document>(document: D) -> Self {
        Self::from_box(Box::new(document))
    }

    pub fn from_box(document: Box<dyn Document>) -> Self {
        Self {
            cell: Rc::new(DocumentCell {
                state: RefCell::new(LazyState::Loaded),
                document: RefCell::new(document),
            }),
        }
    }

    /// Create a proxy that runs `initializer` on first access
    pub fn lazy(document: Box<dyn Document>, initializer: Initializer) -> Self {
        Self {
            cell: Rc::new(DocumentCell {
                state: RefCell::new(LazyState::Unloaded(initializer)),
                document: RefCell::new(document),
            }),
        }
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey(Rc::as_ptr(&self.cell) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &DocumentRef) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn downgrade(&self) -> WeakDocumentRef {
        WeakDocumentRef {
            cell: Rc::downgrade(&self.cell),
        }
    }

    /// Whether the proxy has been initialized (always true for plain documents)
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.cell.state.try_borrow().as_deref(),
            Ok(LazyState::Loaded)
        )
    }

    /// Concrete type name, without initializing
    pub fn type_name(&self) -> &'static str {
        match self.cell.document.try_borrow() {
            Ok(document) => (**document).type_name(),
            Err(_) => "<borrowed document>",
        }
    }

    /// Whether the document is a `T`, without initializing
    pub fn is<T: Document>(&self) -> bool {
        match self.cell.document.try_borrow() {
            Ok(document) => (**document).as_any().is::<T>(),
            Err(_) => false,
        }
    }

    /// Run the initializer if this is an unloaded proxy
    pub fn initialize(&self) -> Result<()> {
        let initializer = {
            let mut state = self
                .cell
                .state
                .try_borrow_mut()
                .map_err(|_| DocumentManagerError::runtime("Proxy state is already borrowed"))?;
            let initializer = match &*state {
                LazyState::Unloaded(initializer) => Rc::clone(initializer),
                LazyState::Loading | LazyState::Loaded => return Ok(()),
            };
            *state = LazyState::Loading;
            initializer
        };

        trace!("Initializing proxy of type {}", self.type_name());
        let result = initializer(self);

        if let Ok(mut state) = self.cell.state.try_borrow_mut() {
            *state = match &result {
                Ok(()) => LazyState::Loaded,
                Err(_) => LazyState::Unloaded(initializer),
            };
        }
        result
    }

    /// Shared access, initializing proxies first
    pub fn borrow(&self) -> Result<Ref<'_, dyn Document>> {
        self.initialize()?;
        self.raw()
    }

    /// Exclusive access, initializing proxies first
    pub fn borrow_mut(&self) -> Result<RefMut<'_, dyn Document>> {
        self.initialize()?;
        self.raw_mut()
    }

    /// Typed shared access
    pub fn read<T: Document, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let document = self.borrow()?;
        let typed = (*document).as_any().downcast_ref::<T>().ok_or_else(|| {
            DocumentManagerError::invalid_argument(format!(
                "Document of type \"{}\" cannot be accessed as \"{}\"",
                document.type_name(),
                std::any::type_name::<T>()
            ))
        })?;
        Ok(f(typed))
    }

    /// Typed exclusive access
    pub fn write<T: Document, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut document = self.borrow_mut()?;
        let type_name = document.type_name();
        let typed = (*document).as_any_mut().downcast_mut::<T>().ok_or_else(|| {
            DocumentManagerError::invalid_argument(format!(
                "Document of type \"{}\" cannot be accessed as \"{}\"",
                type_name,
                std::any::type_name::<T>()
            ))
        })?;
        Ok(f(typed))
    }

    /// Shared access without triggering initialization
    pub(crate) fn raw(&self) -> Result<Ref<'_, dyn Document>> {
        let document = self
            .cell
            .document
            .try_borrow()
            .map_err(|_| borrow_conflict("<unknown>"))?;
        Ok(Ref::map(document, |document| &**document))
    }

    /// Exclusive access without triggering initialization
    pub(crate) fn raw_mut(&self) -> Result<RefMut<'_, dyn Document>> {
        let type_name = self.type_name();
        let document = self
            .cell
            .document
            .try_borrow_mut()
            .map_err(|_| borrow_conflict(type_name))?;
        Ok(RefMut::map(document, |document| &mut **document))
    }

    /// Drop the initializer: the document has been hydrated by other means
    pub(crate) fn mark_initialized(&self) {
        if let Ok(mut state) = self.cell.state.try_borrow_mut() {
            *state = LazyState::Loaded;
        }
    }
}

impl PartialEq for DocumentRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DocumentRef {}

impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRef")
            .field("type", &self.type_name())
            .field("key", &self.key())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use crate::document_fields;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct Page {
        title: Option<String>,
    }

    impl Document for Page {
        document_fields!(title);
    }

    #[derive(Debug, Default)]
    struct Other;

    impl Document for Other {
        document_fields!();
    }

    fn counting_proxy(counter: Rc<Cell<usize>>) -> DocumentRef {
        DocumentRef::lazy(
            Box::new(Page::default()),
            Rc::new(move |document: &DocumentRef| {
                counter.set(counter.get() + 1);
                document
                    .raw_mut()?
                    .set_field("title", FieldValue::Value(json!("loaded")))
                    .map_err(DocumentManagerError::runtime)
            }),
        )
    }

    #[test]
    fn test_identity_is_pointer_identity() {
        let a = DocumentRef::new(Page::default());
        let b = DocumentRef::new(Page::default());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.key(), a.clone().key());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_proxy_initializes_once() {
        let counter = Rc::new(Cell::new(0));
        let proxy = counting_proxy(counter.clone());

        assert!(!proxy.is_initialized());
        assert!(proxy.is::<Page>());
        assert_eq!(counter.get(), 0);

        let title = proxy.read(|page: &Page| page.title.clone()).unwrap();
        assert_eq!(title.as_deref(), Some("loaded"));
        proxy.read(|page: &Page| page.title.clone()).unwrap();
        proxy.write(|page: &mut Page| page.title = None).unwrap();

        assert_eq!(counter.get(), 1);
        assert!(proxy.is_initialized());
    }

    #[test]
    fn test_failed_initialization_is_retried() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let proxy = DocumentRef::lazy(
            Box::new(Page::default()),
            Rc::new(move |_: &DocumentRef| {
                counter.set(counter.get() + 1);
                if counter.get() == 1 {
                    Err(DocumentManagerError::runtime("first attempt fails"))
                } else {
                    Ok(())
                }
            }),
        );

        assert!(proxy.borrow().is_err());
        assert!(!proxy.is_initialized());
        assert!(proxy.borrow().is_ok());
        assert!(proxy.is_initialized());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_mark_initialized_discards_initializer() {
        let counter = Rc::new(Cell::new(0));
        let proxy = counting_proxy(counter.clone());
        proxy.mark_initialized();
        proxy.borrow().unwrap();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_wrong_type_access() {
        let document = DocumentRef::new(Other);
        let error = document.read(|_: &Page| ()).unwrap_err();
        assert!(matches!(error, DocumentManagerError::InvalidArgument(_)));
        assert!(!document.is::<Page>());
    }

    #[test]
    fn test_borrow_conflict_is_an_error() {
        let document = DocumentRef::new(Page::default());
        let _guard = document.borrow_mut().unwrap();
        assert!(matches!(
            document.borrow(),
            Err(DocumentManagerError::Runtime(_))
        ));
    }

    #[test]
    fn test_weak_handle() {
        let document = DocumentRef::new(Page::default());
        let weak = document.downgrade();
        assert_eq!(weak.upgrade(), Some(document.clone()));
        drop(document);
        assert!(weak.upgrade().is_none());
    }
}
