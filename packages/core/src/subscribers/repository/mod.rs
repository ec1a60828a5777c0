//! Subscribers talking to the repository on behalf of the façade operations

mod find;
mod general;
mod query;
mod remove;
mod reorder;

pub use find::FindSubscriber;
pub use general::GeneralSubscriber;
pub use query::QuerySubscriber;
pub use remove::RemoveSubscriber;
pub use reorder::ReorderSubscriber;
