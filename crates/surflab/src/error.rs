//! Error types for the label catalog and the session facade.

use thiserror::Error;

/// Errors from label catalog operations.
#[derive(Error, Debug)]
pub enum LabelError {
    /// A lookup that the operation required came up empty.
    #[error("label not found: {0}")]
    NotFound(String),

    /// A structural violation, e.g. reparenting a label under its own
    /// descendant.
    #[error("invalid label operation: {0}")]
    InvalidOperation(String),

    /// Label names are unique within a catalog.
    #[error("duplicate label name: {0}")]
    Duplicate(String),
}

/// Top-level session error, aggregating every subsystem.
#[derive(Error, Debug)]
pub enum LabelerError {
    /// Scene store failure.
    #[error(transparent)]
    Store(#[from] surflab_store::StoreError),

    /// Resolution cache failure.
    #[error(transparent)]
    Cache(#[from] surflab_cache::CacheError),

    /// Journal failure. Fatal to the in-flight edit; the edit was rolled
    /// back and must be surfaced to the operator.
    #[error(transparent)]
    Journal(#[from] surflab_journal::JournalError),

    /// Snapshot failure.
    #[error(transparent)]
    Snapshot(#[from] surflab_journal::SnapshotError),

    /// Label catalog failure.
    #[error(transparent)]
    Label(#[from] LabelError),
}
