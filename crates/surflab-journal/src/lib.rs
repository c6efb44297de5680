//! Durable edit history for surfel labeling sessions.
//!
//! The journal is the source of truth: every label assignment, undo,
//! and redo is an append-only JSONL record, synced to disk before the
//! in-memory state changes. [`AssignmentState`] is a materialized view
//! rebuildable by replay; [`SnapshotManager`] writes numbered full
//! copies of that view for cheap recovery and auditing.

mod error;
mod journal;
mod lock;
mod record;
mod snapshot;
mod state;

pub use error::{JournalError, SnapshotError};
pub use journal::EditJournal;
pub use lock::SessionLock;
pub use record::{HistoryRecord, PointChange};
pub use snapshot::{SnapshotManager, SnapshotMeta};
pub use state::AssignmentState;

/// Convenience alias for journal results.
pub type Result<T> = std::result::Result<T, JournalError>;
