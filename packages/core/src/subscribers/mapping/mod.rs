//! Identity fields, relationships and mapped fields
//!
//! Every subscriber here is a no-op for documents without the matching
//! behavior. Hydration runs them at the mapping stage after the document
//! has been registered, so relationships can resolve proxies through the
//! registry.

mod children;
mod fields;
mod locale;
mod node_name;
mod parent;
mod path;
mod referrer;
mod uuid;

pub use children::ChildrenSubscriber;
pub use fields::FieldSubscriber;
pub use locale::LocaleSubscriber;
pub use node_name::NodeNameSubscriber;
pub use parent::ParentSubscriber;
pub use path::PathSubscriber;
pub use referrer::ReferrerSubscriber;
pub use uuid::UuidSubscriber;
