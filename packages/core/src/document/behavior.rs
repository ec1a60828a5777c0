//! Document capabilities
//!
//! Each trait is one optional behavior a document can opt into by returning
//! itself from the matching accessor on [`Document`](super::Document).
//! Subscribers fill and read these during hydration and persistence.

use super::DocumentRef;
use crate::models::Version;
use crate::proxy::{ChildrenCollection, ReferrerCollection};
use chrono::{DateTime, Utc};

/// Receives the node identifier (`jcr:uuid`)
///
/// A uuid set before the first persist is used for the new node.
pub trait UuidBehavior {
    fn uuid(&self) -> Option<&str>;
    fn set_uuid(&mut self, uuid: String);
}

/// Receives the node name
pub trait NodeNameBehavior {
    fn node_name(&self) -> Option<&str>;
    fn set_node_name(&mut self, name: String);
}

/// Receives the absolute node path
pub trait PathBehavior {
    fn path(&self) -> Option<&str>;
    fn set_path(&mut self, path: String);
}

/// Has a parent document
///
/// Hydration sets a lazy proxy of the parent. Persisting with a different
/// parent moves the node.
pub trait ParentBehavior {
    fn parent(&self) -> Option<&DocumentRef>;
    fn set_parent(&mut self, parent: Option<DocumentRef>);
}

/// Exposes the child documents as a lazy collection
pub trait ChildrenBehavior {
    fn children(&self) -> Option<&ChildrenCollection>;
    fn set_children(&mut self, children: ChildrenCollection);
}

/// Exposes the documents referencing this one as a lazy collection
pub trait ReferrerBehavior {
    fn referrers(&self) -> Option<&ReferrerCollection>;
    fn set_referrers(&mut self, referrers: ReferrerCollection);
}

/// Tracks the locale the document is currently loaded in
pub trait LocaleBehavior {
    fn locale(&self) -> Option<&str>;
    fn set_locale(&mut self, locale: String);

    /// Locale the document was first hydrated in
    fn original_locale(&self) -> Option<&str> {
        None
    }

    fn set_original_locale(&mut self, _locale: String) {}
}

/// Derives the node name from a title
pub trait AutoNameBehavior {
    fn title(&self) -> Option<&str>;
}

/// Records who created and last changed the document
pub trait BlameBehavior {
    fn creator(&self) -> Option<i64>;
    fn set_creator(&mut self, creator: Option<i64>);
    fn changer(&self) -> Option<i64>;
    fn set_changer(&mut self, changer: Option<i64>);
}

/// Records when the document was created and last changed
pub trait TimestampBehavior {
    fn created(&self) -> Option<DateTime<Utc>>;
    fn set_created(&mut self, created: Option<DateTime<Utc>>);
    fn changed(&self) -> Option<DateTime<Utc>>;
    fn set_changed(&mut self, changed: Option<DateTime<Utc>>);
}

/// Keeps a version history; the node is made versionable on persist
pub trait VersionBehavior {
    fn versions(&self) -> &[Version];
    fn set_versions(&mut self, versions: Vec<Version>);
}
