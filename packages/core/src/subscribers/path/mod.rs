//! Where new nodes go and what they are called
//!
//! Filing subscribers pick the parent node of a persisted document; the
//! explicit subscriber honors `path`, `parent_path` and `node_name`; the
//! auto name subscriber derives node names from titles.

mod alias_filing;
mod auto_name;
mod base_path;
mod explicit;
mod reset_filing;

pub use alias_filing::{pluralize, AliasFilingSubscriber};
pub use auto_name::AutoNameSubscriber;
pub use base_path::BasePathSubscriber;
pub use explicit::ExplicitSubscriber;
pub use reset_filing::ResetFilingPathSubscriber;
