//! Docmapper Core - Document Mapping Layer
//!
//! This crate maps application documents (plain Rust structs) onto nodes of a
//! hierarchical content repository and back, through a staged, synchronous
//! event pipeline.
//!
//! # Architecture
//!
//! - **Façade over events**: every [`DocumentManager`] operation dispatches one
//!   event; independent subscribers implement filing, naming, field mapping,
//!   auditing and versioning
//! - **Identity map**: one document instance per node and manager, tracked by
//!   the [`DocumentRegistry`](registry::DocumentRegistry)
//! - **Lazy relationships**: parents, references, children, referrers and
//!   query results are proxies hydrated on first access
//! - **Repository boundary**: the [`Session`](session::Session) trait, with an
//!   in-memory implementation
//!
//! # Modules
//!
//! - [`manager`] - The document manager façade and its builder
//! - [`events`] - Event types, stages, options and the dispatcher
//! - [`subscribers`] - The default pipeline
//! - [`document`] - The document trait, behaviors and document handles
//! - [`metadata`] - Per-type mapping metadata
//! - [`session`] - Repository boundary, query object model and JCR-SQL2 parser
//! - [`query`] - Queries, the query builder and its converter

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod events;
pub mod manager;
pub mod metadata;
pub mod models;
pub mod name_resolver;
pub mod node_manager;
pub mod property_encoder;
pub mod proxy;
pub mod query;
pub mod registry;
pub mod session;
pub mod slugifier;
pub mod strategy;
pub mod subscribers;

// Re-export commonly used types
pub use config::DocumentManagerConfig;
pub use document::{Document, DocumentRef, FieldValue};
pub use error::{DocumentManagerError, Result};
pub use events::Options;
pub use manager::{DocumentManager, DocumentManagerBuilder};
pub use metadata::{MappingOptions, Metadata, MetadataFactory};
pub use query::{HydrationMode, Query, QueryBuilder};
pub use session::{InMemorySession, Session};
