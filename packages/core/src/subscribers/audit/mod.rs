//! Who changed a document and when
//!
//! Both subscribers store their values as localized system properties, so
//! every translation keeps its own audit trail.

mod blame;
mod timestamp;

pub use blame::BlameSubscriber;
pub use timestamp::TimestampSubscriber;
