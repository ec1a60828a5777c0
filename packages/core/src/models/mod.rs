//! Data Models
//!
//! Plain data structures shared across the mapper:
//!
//! - `Version` - one entry of a document's version history
//! - `time` - clock abstraction used to stamp versions and audit fields

mod version;
pub mod time;

pub use version::Version;
