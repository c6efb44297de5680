//! Error types for the block store.

use thiserror::Error;

use surflab_types::BlockId;

/// Errors that can occur while reading a scene store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Disk read or write failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block id not present in the scene manifest.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Block exists but has no such resolution level.
    #[error("block {block:?} has no resolution level {level}")]
    LevelNotFound {
        /// The block looked up.
        block: BlockId,
        /// The requested level.
        level: usize,
    },

    /// Manifest failed to parse or violates a structural invariant.
    #[error("invalid scene manifest: {0}")]
    Manifest(String),

    /// Level payload failed to decode.
    #[error("corrupt level payload for block {block:?} level {level}: {detail}")]
    Corrupt {
        /// The block being decoded.
        block: BlockId,
        /// The level being decoded.
        level: usize,
        /// Decoder message.
        detail: String,
    },
}
