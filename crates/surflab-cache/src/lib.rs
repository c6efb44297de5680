//! Multiresolution working-set cache for surflab.
//!
//! The cache converges the in-memory set of (block, resolution level)
//! pairs toward what the viewer's focus point, focus radius, and target
//! resolution ask for, without ever blocking the interaction thread:
//! disk reads happen on a background pool and land at an explicit
//! per-frame commit point. Load failures degrade the affected block with
//! capped exponential backoff instead of surfacing to the session.

mod cache;
mod error;
mod loader;

pub use cache::{
    CacheMode, ResolutionCache, DEFAULT_LOADS_PER_TICK, DEFAULT_MEMORY_CEILING,
};
pub use error::CacheError;
pub use loader::{BlockLoader, LoadCompletion};

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
