//! Scene manifest — the JSON index the store reads at open.
//!
//! The manifest describes every block (bounds plus its resolution level
//! descriptors) and carries the seed label catalog. Level payloads live in
//! separate postcard files addressed by block id and level; the manifest
//! never contains surfel data.

use serde::{Deserialize, Serialize};

use surflab_types::{Aabb, BlockId, LabelFlags, LabelId};

use crate::StoreError;

/// Descriptor of one resolution level of a block.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LevelMeta {
    /// Approximate surfel count at this level.
    pub points: u32,
    /// Payload size on disk in bytes.
    pub bytes: u64,
    /// Approximate spacing between surfels (world units). Strictly
    /// decreasing from coarsest to finest.
    pub spacing: f32,
}

/// Descriptor of one spatial block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Store-assigned id.
    pub id: BlockId,
    /// Bounding volume of the block's surfels.
    pub bounds: Aabb,
    /// Resolution levels, coarsest (index 0) to finest.
    pub levels: Vec<LevelMeta>,
}

impl BlockMeta {
    /// Index of the finest level.
    pub fn finest_level(&self) -> usize {
        self.levels.len() - 1
    }
}

/// A label carried by the scene file, used to seed the label catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelSeed {
    /// Catalog id.
    pub id: LabelId,
    /// Unique name.
    pub name: String,
    /// Parent label, if any.
    #[serde(default)]
    pub parent: Option<LabelId>,
    /// Behavior flags persisted with the scene.
    #[serde(default)]
    pub flags: LabelFlags,
}

/// The scene manifest (`scene.json`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneManifest {
    /// Human-readable scene name.
    pub name: String,
    /// All blocks in the scene.
    pub blocks: Vec<BlockMeta>,
    /// Seed label catalog.
    #[serde(default)]
    pub labels: Vec<LabelSeed>,
}

impl SceneManifest {
    /// Validate structural invariants.
    ///
    /// Every block must have at least one level, and level point counts
    /// must be monotonically non-decreasing from coarsest to finest.
    pub fn validate(&self) -> Result<(), StoreError> {
        for block in &self.blocks {
            if block.levels.is_empty() {
                return Err(StoreError::Manifest(format!(
                    "block {} has no resolution levels",
                    block.id
                )));
            }
            for pair in block.levels.windows(2) {
                if pair[1].points < pair[0].points {
                    return Err(StoreError::Manifest(format!(
                        "block {} level point counts decrease ({} -> {})",
                        block.id, pair[0].points, pair[1].points
                    )));
                }
            }
        }
        let mut ids: Vec<BlockId> = self.blocks.iter().map(|b| b.id).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != self.blocks.len() {
            return Err(StoreError::Manifest("duplicate block id".to_string()));
        }
        Ok(())
    }

    /// Bounding box of the whole scene.
    pub fn scene_bounds(&self) -> Aabb {
        self.blocks
            .iter()
            .fold(Aabb::empty(), |acc, b| acc.union(&b.bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: u64, points: &[u32]) -> BlockMeta {
        BlockMeta {
            id: BlockId::new(id),
            bounds: Aabb::new([0.0; 3], [1.0; 3]),
            levels: points
                .iter()
                .map(|&p| LevelMeta {
                    points: p,
                    bytes: (p as u64) * 32,
                    spacing: 1.0 / (p as f32).sqrt(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let manifest = SceneManifest {
            name: "test".to_string(),
            blocks: vec![block(0, &[10, 100, 1000]), block(1, &[5, 5, 50])],
            labels: vec![],
        };
        manifest.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_levels() {
        let manifest = SceneManifest {
            name: "test".to_string(),
            blocks: vec![block(0, &[])],
            labels: vec![],
        };
        assert!(matches!(
            manifest.validate(),
            Err(StoreError::Manifest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_decreasing_density() {
        let manifest = SceneManifest {
            name: "test".to_string(),
            blocks: vec![block(0, &[100, 10])],
            labels: vec![],
        };
        assert!(matches!(
            manifest.validate(),
            Err(StoreError::Manifest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let manifest = SceneManifest {
            name: "test".to_string(),
            blocks: vec![block(3, &[10]), block(3, &[10])],
            labels: vec![],
        };
        assert!(matches!(
            manifest.validate(),
            Err(StoreError::Manifest(_))
        ));
    }

    #[test]
    fn test_scene_bounds_unions_blocks() {
        let mut b0 = block(0, &[10]);
        b0.bounds = Aabb::new([0.0; 3], [1.0; 3]);
        let mut b1 = block(1, &[10]);
        b1.bounds = Aabb::new([5.0; 3], [6.0; 3]);
        let manifest = SceneManifest {
            name: "test".to_string(),
            blocks: vec![b0, b1],
            labels: vec![],
        };
        let bounds = manifest.scene_bounds();
        assert_eq!(bounds.min, [0.0; 3]);
        assert_eq!(bounds.max, [6.0; 3]);
    }
}
