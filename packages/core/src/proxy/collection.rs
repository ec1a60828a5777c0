//! Lazy document collections
//!
//! Membership (the list of nodes) is resolved once, on first use. Each
//! position dispatches a HYDRATE for its node the first time it is read.
//! Hydrated members are remembered through weak handles, so iterating again
//! neither re-queries the repository nor re-hydrates while the documents
//! are alive, and members never keep their owner alive.

use crate::context::DocumentManagerContext;
use crate::document::{DocumentRef, WeakDocumentRef};
use crate::error::{DocumentManagerError, Result};
use crate::events::{HydrateEvent, Options};
use crate::session::{NodeId, Session};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

type MembershipSource = Box<dyn Fn(&dyn Session) -> Result<Vec<NodeId>>>;

struct CollectionInner {
    context: Weak<DocumentManagerContext>,
    locale: Option<String>,
    options: Options,
    source: MembershipSource,
    members: RefCell<Option<Rc<Vec<NodeId>>>>,
    documents: RefCell<HashMap<usize, WeakDocumentRef>>,
}

/// Shared, cheaply clonable lazy sequence of documents
#[derive(Clone)]
pub struct LazyCollection {
    inner: Rc<CollectionInner>,
}

impl LazyCollection {
    pub(crate) fn new(
        context: Weak<DocumentManagerContext>,
        locale: Option<String>,
        options: Options,
        source: impl Fn(&dyn Session) -> Result<Vec<NodeId>> + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                context,
                locale,
                options,
                source: Box::new(source),
                members: RefCell::new(None),
                documents: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Locale the members are hydrated in
    pub fn locale(&self) -> Option<&str> {
        self.inner.locale.as_deref()
    }

    /// Nodes of the collection, resolved on first call
    pub fn nodes(&self) -> Result<Rc<Vec<NodeId>>> {
        if let Some(members) = self.inner.members.borrow().as_ref() {
            return Ok(Rc::clone(members));
        }

        let context = self.context()?;
        let members = Rc::new((self.inner.source)(context.session().as_ref())?);
        *self.inner.members.borrow_mut() = Some(Rc::clone(&members));
        Ok(members)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.nodes()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether membership has been resolved yet
    pub fn is_resolved(&self) -> bool {
        self.inner.members.borrow().is_some()
    }

    /// Document at `index`, hydrating it on first access
    pub fn get(&self, index: usize) -> Result<Option<DocumentRef>> {
        let cached = self
            .inner
            .documents
            .borrow()
            .get(&index)
            .and_then(WeakDocumentRef::upgrade);
        if let Some(document) = cached {
            return Ok(Some(document));
        }

        let node = match self.nodes()?.get(index) {
            Some(node) => *node,
            None => return Ok(None),
        };

        let context = self.context()?;
        let mut event = HydrateEvent::new(node, self.inner.locale.clone(), self.inner.options.clone());
        context.dispatch(&mut event)?;
        let document = event.document()?.clone();

        self.inner
            .documents
            .borrow_mut()
            .insert(index, document.downgrade());
        Ok(Some(document))
    }

    pub fn iter(&self) -> CollectionIter {
        CollectionIter {
            collection: self.clone(),
            position: 0,
        }
    }

    /// Hydrate every member
    pub fn to_vec(&self) -> Result<Vec<DocumentRef>> {
        self.iter().collect()
    }

    fn context(&self) -> Result<Rc<DocumentManagerContext>> {
        self.inner.context.upgrade().ok_or_else(|| {
            DocumentManagerError::runtime("The document manager owning this collection has been dropped")
        })
    }
}

impl fmt::Debug for LazyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection")
            .field("locale", &self.inner.locale)
            .field("members", &self.inner.members.borrow().as_ref().map(|m| m.len()))
            .finish()
    }
}

/// Iterator hydrating one member per step
pub struct CollectionIter {
    collection: LazyCollection,
    position: usize,
}

impl Iterator for CollectionIter {
    type Item = Result<DocumentRef>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.collection.get(self.position).transpose();
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

impl<'a> IntoIterator for &'a LazyCollection {
    type Item = Result<DocumentRef>;
    type IntoIter = CollectionIter;

    fn into_iter(self) -> CollectionIter {
        self.iter()
    }
}

macro_rules! collection_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(LazyCollection);

        impl $name {
            pub(crate) fn from_lazy(collection: LazyCollection) -> Self {
                Self(collection)
            }
        }

        impl Deref for $name {
            type Target = LazyCollection;

            fn deref(&self) -> &LazyCollection {
                &self.0
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = Result<DocumentRef>;
            type IntoIter = CollectionIter;

            fn into_iter(self) -> CollectionIter {
                self.0.iter()
            }
        }
    };
}

collection_type!(
    /// Child documents of a node, in node order
    ChildrenCollection
);

collection_type!(
    /// Documents holding a reference to a node
    ReferrerCollection
);

collection_type!(
    /// Documents matched by a query, in result order
    QueryResultCollection
);
