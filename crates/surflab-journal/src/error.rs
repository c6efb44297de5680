//! Error types for the journal and snapshot manager.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the edit history journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Journal file could not be read or written. Fatal to the in-flight
    /// edit: the caller must roll back the in-memory mutation.
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another session already holds this scene's journal lock.
    #[error("journal already open by another session (lock file {0})")]
    AlreadyOpen(PathBuf),

    /// A journal line failed to parse somewhere other than the tail.
    #[error("corrupt journal record at line {line}: {detail}")]
    Corrupt {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        detail: String,
    },

    /// Replay target beyond the journal's length.
    #[error("replay sequence {seq} out of range (journal has {len} records)")]
    OutOfRange {
        /// Requested sequence.
        seq: u64,
        /// Number of records available.
        len: usize,
    },
}

/// Errors that can occur while writing or reading snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// `snapshot()` was called before a directory was configured.
    #[error("no snapshot directory configured")]
    NotConfigured,

    /// Snapshot directory or file could not be written/read.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file failed to encode or decode.
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
