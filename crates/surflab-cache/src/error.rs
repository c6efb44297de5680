//! Error types for the resolution cache.

use thiserror::Error;

use surflab_store::StoreError;

/// Errors that can occur during cache operations.
///
/// Background load failures never surface here — they are recovered
/// locally with retry/backoff so the interactive loop keeps running. This
/// enum covers the synchronous paths: startup eager loads and lifecycle.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A synchronous (startup) load failed.
    #[error("cache load failed: {0}")]
    Store(#[from] StoreError),

    /// The background loader could not be started.
    #[error("failed to start block loader: {0}")]
    Loader(#[from] std::io::Error),

    /// Operation on a cache that has been closed.
    #[error("cache is closed")]
    Closed,
}
