//! The scene store — disk-resident container of multiresolution blocks.
//!
//! Layout on disk:
//!
//! ```text
//! <scene dir>/
//!   scene.json                  manifest (blocks, levels, label seeds)
//!   blocks/<id>/level<k>.sfl    postcard-encoded Vec<Surfel>
//! ```
//!
//! The store is read-only during labeling: labels travel through the edit
//! journal and snapshots, never back into block payloads. `load_level`
//! takes `&self` and touches no shared mutable state, so concurrent loads
//! of distinct blocks from background workers are safe.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use surflab_types::{BlockId, Surfel};

use crate::manifest::{BlockMeta, LabelSeed, LevelMeta, SceneManifest};
use crate::morton::morton_code;
use crate::StoreError;

const MANIFEST_FILE: &str = "scene.json";

/// Read handle to a scene directory.
pub struct SceneStore {
    dir: PathBuf,
    manifest: SceneManifest,
    /// Block ids sorted by Morton code of the bound centroid. Stable for
    /// the lifetime of the store; this ordering is what makes prefetch of
    /// adjacent blocks effective.
    order: Vec<BlockId>,
    index: HashMap<BlockId, usize>,
}

impl SceneStore {
    /// Open a scene directory, parse and validate its manifest.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let raw = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: SceneManifest =
            serde_json::from_str(&raw).map_err(|e| StoreError::Manifest(e.to_string()))?;
        manifest.validate()?;

        let scene_bounds = manifest.scene_bounds();
        let mut order: Vec<(u64, BlockId)> = manifest
            .blocks
            .iter()
            .map(|b| (morton_code(b.bounds.center(), &scene_bounds), b.id))
            .collect();
        order.sort();
        let order: Vec<BlockId> = order.into_iter().map(|(_, id)| id).collect();

        let index = manifest
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect();

        tracing::debug!(
            scene = %manifest.name,
            blocks = manifest.blocks.len(),
            labels = manifest.labels.len(),
            "opened scene store"
        );

        Ok(Self {
            dir,
            manifest,
            order,
            index,
        })
    }

    /// The scene directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scene name from the manifest.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Seed labels carried by the scene file.
    pub fn label_seeds(&self) -> &[LabelSeed] {
        &self.manifest.labels
    }

    /// All block ids in spatially coherent (Morton) order.
    pub fn block_ids(&self) -> &[BlockId] {
        &self.order
    }

    /// Number of blocks in the scene.
    pub fn block_count(&self) -> usize {
        self.order.len()
    }

    /// Metadata for one block.
    pub fn block(&self, id: BlockId) -> Result<&BlockMeta, StoreError> {
        self.index
            .get(&id)
            .map(|&i| &self.manifest.blocks[i])
            .ok_or(StoreError::BlockNotFound(id))
    }

    /// The coarsest level of a block. Always 0 for a valid id.
    pub fn coarsest_level(&self, id: BlockId) -> Result<usize, StoreError> {
        self.block(id).map(|_| 0)
    }

    /// The finest level of a block.
    pub fn finest_level(&self, id: BlockId) -> Result<usize, StoreError> {
        self.block(id).map(|b| b.finest_level())
    }

    /// Level metadata, or `LevelNotFound`.
    pub fn level(&self, id: BlockId, level: usize) -> Result<&LevelMeta, StoreError> {
        let block = self.block(id)?;
        block
            .levels
            .get(level)
            .ok_or(StoreError::LevelNotFound { block: id, level })
    }

    /// Load one resolution level of one block from disk.
    ///
    /// Pure disk read; never mutates persisted content.
    pub fn load_level(&self, id: BlockId, level: usize) -> Result<Vec<Surfel>, StoreError> {
        // Validate against the manifest before touching the disk so a bad
        // level index reports LevelNotFound, not a file error.
        self.level(id, level)?;
        let path = self.level_path(id, level);
        let bytes = fs::read(&path)?;
        postcard::from_bytes(&bytes).map_err(|e| StoreError::Corrupt {
            block: id,
            level,
            detail: e.to_string(),
        })
    }

    fn level_path(&self, id: BlockId, level: usize) -> PathBuf {
        self.dir
            .join("blocks")
            .join(id.raw().to_string())
            .join(format!("level{level}.sfl"))
    }
}

/// Input to `write_scene`: one block's bounds plus its level payloads,
/// coarsest first.
pub struct BlockSpec {
    /// Bounding volume.
    pub bounds: surflab_types::Aabb,
    /// Per-level surfel spacing and payload, coarsest first.
    pub levels: Vec<(f32, Vec<Surfel>)>,
}

/// Write a scene directory from block specs and label seeds.
///
/// Used by the preprocessing path and by test fixtures. Block ids are
/// assigned densely in input order.
pub fn write_scene(
    dir: impl AsRef<Path>,
    name: &str,
    blocks: Vec<BlockSpec>,
    labels: Vec<LabelSeed>,
) -> Result<(), StoreError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut metas = Vec::with_capacity(blocks.len());
    for (i, spec) in blocks.into_iter().enumerate() {
        let id = BlockId::new(i as u64);
        let block_dir = dir.join("blocks").join(id.raw().to_string());
        fs::create_dir_all(&block_dir)?;

        let mut levels = Vec::with_capacity(spec.levels.len());
        for (k, (spacing, surfels)) in spec.levels.into_iter().enumerate() {
            let bytes = postcard::to_stdvec(&surfels).map_err(|e| StoreError::Corrupt {
                block: id,
                level: k,
                detail: e.to_string(),
            })?;
            fs::write(block_dir.join(format!("level{k}.sfl")), &bytes)?;
            levels.push(LevelMeta {
                points: surfels.len() as u32,
                bytes: bytes.len() as u64,
                spacing,
            });
        }

        metas.push(BlockMeta {
            id,
            bounds: spec.bounds,
            levels,
        });
    }

    let manifest = SceneManifest {
        name: name.to_string(),
        blocks: metas,
        labels,
    };
    manifest.validate()?;
    let json =
        serde_json::to_string_pretty(&manifest).map_err(|e| StoreError::Manifest(e.to_string()))?;
    fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use surflab_types::Aabb;

    fn surfels(n: usize, base: f32) -> Vec<Surfel> {
        (0..n)
            .map(|i| Surfel {
                position: [base + i as f32, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                color: [128, 128, 128],
                radius: 0.1,
            })
            .collect()
    }

    fn write_test_scene(dir: &Path) {
        let blocks = vec![
            BlockSpec {
                bounds: Aabb::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
                levels: vec![(1.0, surfels(4, 0.0)), (0.25, surfels(16, 0.0))],
            },
            BlockSpec {
                bounds: Aabb::new([10.0, 0.0, 0.0], [11.0, 1.0, 1.0]),
                levels: vec![(1.0, surfels(3, 10.0)), (0.25, surfels(12, 10.0))],
            },
            BlockSpec {
                bounds: Aabb::new([0.5, 0.0, 0.0], [1.5, 1.0, 1.0]),
                levels: vec![(1.0, surfels(5, 0.5)), (0.25, surfels(20, 0.5))],
            },
        ];
        write_scene(dir, "test-scene", blocks, vec![]).unwrap();
    }

    #[test]
    fn test_open_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());

        let store = SceneStore::open(tmp.path()).unwrap();
        assert_eq!(store.name(), "test-scene");
        assert_eq!(store.block_count(), 3);

        let id = BlockId::new(0);
        assert_eq!(store.coarsest_level(id).unwrap(), 0);
        assert_eq!(store.finest_level(id).unwrap(), 1);

        let coarse = store.load_level(id, 0).unwrap();
        let fine = store.load_level(id, 1).unwrap();
        assert_eq!(coarse.len(), 4);
        assert_eq!(fine.len(), 16);
    }

    #[test]
    fn test_morton_order_groups_neighbors() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());
        let store = SceneStore::open(tmp.path()).unwrap();

        // Blocks 0 and 2 overlap near the origin; block 1 is far away.
        // Spatial order must put 0 and 2 adjacent.
        let order = store.block_ids();
        let pos = |id: u64| {
            order
                .iter()
                .position(|b| b.raw() == id)
                .unwrap() as isize
        };
        assert_eq!((pos(0) - pos(2)).abs(), 1);
    }

    #[test]
    fn test_order_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());
        let a = SceneStore::open(tmp.path()).unwrap();
        let b = SceneStore::open(tmp.path()).unwrap();
        assert_eq!(a.block_ids(), b.block_ids());
    }

    #[test]
    fn test_missing_level() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());
        let store = SceneStore::open(tmp.path()).unwrap();

        let err = store.load_level(BlockId::new(0), 9).unwrap_err();
        assert!(matches!(err, StoreError::LevelNotFound { level: 9, .. }));
    }

    #[test]
    fn test_missing_block() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());
        let store = SceneStore::open(tmp.path()).unwrap();

        let err = store.block(BlockId::new(99)).unwrap_err();
        assert!(matches!(err, StoreError::BlockNotFound(_)));
    }

    #[test]
    fn test_corrupt_payload() {
        let tmp = tempfile::tempdir().unwrap();
        write_test_scene(tmp.path());

        // Truncate a payload behind the store's back.
        fs::write(tmp.path().join("blocks/0/level0.sfl"), b"x").unwrap();
        let store = SceneStore::open(tmp.path()).unwrap();
        let err = store.load_level(BlockId::new(0), 0).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_open_rejects_missing_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            SceneStore::open(tmp.path()),
            Err(StoreError::Io(_))
        ));
    }
}
