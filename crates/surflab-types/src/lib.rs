//! Shared identity, geometry, and label types for surflab.
//!
//! Everything here is plain data: typed IDs, the surfel sample and its
//! bounding box, and label behavior flags. Stateful structures (the scene
//! store, the resolution cache, the edit journal, the label tree) live in
//! their own crates and build on these types.

mod flags;
mod ids;
mod surfel;

pub use flags::LabelFlags;
pub use ids::{BlockId, LabelId, PointRef, SessionId};
pub use surfel::{Aabb, Surfel};
