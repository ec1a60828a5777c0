//! Handler ordering per channel
//!
//! Listeners run in ascending stage order; listeners in the same stage run
//! in registration order.

/// Stages of channels without a dedicated ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Prepare,
    Handle,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HydrateStage {
    /// Fill in the manager's default locale
    DefaultLocale,
    /// Reuse the document already registered for the node
    ReuseFromRegistry,
    /// Stop when the document is already hydrated in the requested locale
    ShortCircuit,
    /// Create a fresh document from the node's metadata
    Instantiate,
    Register,
    /// Behavior and field mapping
    Mapping,
    MarkHydrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PersistStage {
    NodeFromRegistry,
    /// Base path filing for new documents
    Filing,
    ParentFromDocument,
    ResetFiling,
    AliasFiling,
    ExplicitPath,
    AutoName,
    /// Add mixins to the resolved node
    PrepareNode,
    Register,
    Mapping,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoveStage {
    Remove,
    Deregister,
}

/// Stages shared by move and copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveStage {
    ResolveName,
    Apply,
    /// Update identity fields after the node changed place
    Remap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReorderStage {
    Apply,
    Remap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlushStage {
    Save,
    ApplyVersions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublishStage {
    PrepareNode,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RestoreStage {
    Restore,
    Finish,
}
