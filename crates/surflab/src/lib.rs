//! Out-of-core surfel scene labeling engine.
//!
//! `surflab` lets an operator attach semantic labels to points in scenes
//! far larger than RAM. Block residency is managed by a focus-driven
//! resolution cache (`surflab-cache`) over a read-only block store
//! (`surflab-store`); every edit goes through a write-ahead journal with
//! snapshots (`surflab-journal`). This crate adds the label catalog,
//! flag-patch configuration, and the [`Labeler`] session facade the
//! UI/render loop drives.

mod error;
mod labeler;
mod labels;
mod patch;
mod scene;

pub use error::{LabelError, LabelerError};
pub use labeler::{Labeler, LabelerConfig};
pub use labels::{Label, LabelTree};
pub use patch::{apply_patches, default_patches, load_patches, FlagPatch};
pub use scene::Scene;

/// Convenience alias for session results.
pub type Result<T> = std::result::Result<T, LabelerError>;
