//! Disk-resident multiresolution block store for surflab scenes.
//!
//! A scene is a directory holding a JSON manifest and one postcard payload
//! per (block, resolution level). The store exposes spatially coherent
//! block iteration (Morton order), metadata lookup, and level loading; it
//! never mutates persisted content during labeling. Label state travels
//! through the edit journal, out-of-band from the surfel payloads.

mod error;
mod manifest;
mod morton;
mod store;

pub use error::StoreError;
pub use manifest::{BlockMeta, LabelSeed, LevelMeta, SceneManifest};
pub use morton::{morton3, morton_code};
pub use store::{write_scene, BlockSpec, SceneStore};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
