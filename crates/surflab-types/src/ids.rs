//! Typed identifiers for blocks, labels, points, and sessions.
//!
//! `BlockId` and `LabelId` are dense integer indices assigned by the scene
//! store and label catalog respectively — they are stable for the lifetime
//! of a scene and cheap to use as map keys. `SessionId` wraps UUIDv7
//! (time-ordered) so concurrent sessions against different scenes sort by
//! creation time in logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a spatial block — the unit of disk residency and eviction.
///
/// Assigned by the scene store at build time; stable across sessions.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    /// Wrap a raw store-assigned index.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw index.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

/// Identifier of a label in the catalog.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(u32);

impl LabelId {
    /// Wrap a raw catalog-assigned index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelId({})", self.0)
    }
}

/// Address of one surfel: a block and an index into that block's finest
/// resolution level.
///
/// This is the unit of label assignment. Ordering is (block, index) so a
/// sorted point set groups by block.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Debug)]
pub struct PointRef {
    /// Owning block.
    pub block: BlockId,
    /// Surfel index within the block's finest level.
    pub index: u32,
}

impl PointRef {
    /// Construct from a block id and surfel index.
    pub const fn new(block: BlockId, index: u32) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// A labeling session identifier (UUIDv7, time-ordered).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new time-ordered ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters — for human display only, not lookup.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// A nil / zero ID — for sentinel values only.
    pub fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    /// Check if this is the nil ID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_roundtrip() {
        let id = BlockId::new(42);
        assert_eq!(id.raw(), 42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_point_ref_ordering_groups_by_block() {
        let a = PointRef::new(BlockId::new(0), 9);
        let b = PointRef::new(BlockId::new(1), 0);
        let c = PointRef::new(BlockId::new(1), 3);
        let mut points = vec![c, a, b];
        points.sort();
        assert_eq!(points, vec![a, b, c]);
    }

    #[test]
    fn test_point_ref_postcard_roundtrip() {
        let p = PointRef::new(BlockId::new(7), 123);
        let bytes = postcard::to_stdvec(&p).unwrap();
        let back: PointRef = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_session_id_unique_and_ordered() {
        let ids: Vec<SessionId> = (0..10).map(|_| SessionId::new()).collect();
        for i in 1..ids.len() {
            assert!(ids[i] >= ids[i - 1]);
        }
        assert_ne!(ids[0], ids[9]);
    }

    #[test]
    fn test_session_id_short_is_8_chars() {
        assert_eq!(SessionId::new().short().len(), 8);
    }

    #[test]
    fn test_debug_shows_type() {
        assert_eq!(format!("{:?}", BlockId::new(3)), "BlockId(3)");
        assert_eq!(format!("{:?}", LabelId::new(5)), "LabelId(5)");
    }
}
