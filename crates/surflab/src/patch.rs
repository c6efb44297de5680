//! Label flag patches.
//!
//! A patch is configuration data: a label name and the flags to enforce
//! on it at scene-open time. Applying a patch list is idempotent and
//! tolerant of absent names, so the same list runs against every scene
//! regardless of which labels it actually carries.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use surflab_types::LabelFlags;

use crate::labels::LabelTree;

/// One flag enforcement: set `flags` on the label named `label`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlagPatch {
    /// Target label name.
    pub label: String,
    /// Flags to add (idempotent).
    pub flags: LabelFlags,
}

impl FlagPatch {
    fn new(label: &str, flags: LabelFlags) -> Self {
        Self {
            label: label.to_string(),
            flags,
        }
    }
}

/// Load a patch list from a JSON file.
pub fn load_patches(path: &Path) -> std::io::Result<Vec<FlagPatch>> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::other)
}

/// Apply a patch list to a catalog. Absent names are skipped silently;
/// returns the number of labels actually touched.
pub fn apply_patches(tree: &mut LabelTree, patches: &[FlagPatch]) -> usize {
    let mut applied = 0;
    for patch in patches {
        if tree.add_flags_by_name(&patch.label, patch.flags) {
            applied += 1;
        } else {
            tracing::debug!(label = %patch.label, "flag patch target absent; skipped");
        }
    }
    applied
}

/// The stock patch list for street-scene taxonomies: sign-like labels
/// face the viewer, ground/vegetation/wire labels have no meaningful
/// orientation.
pub fn default_patches() -> Vec<FlagPatch> {
    const TOWARDS_FRONT: &[&str] = &["Billboard", "BusinessSign", "TempTrafficSign", "TrafficSign"];
    const UNORIENTABLE: &[&str] = &[
        "Bridge",
        "BuildingInterior",
        "Crosswalk",
        "Driveway",
        "Fence",
        "FireHydrant",
        "GuardRail",
        "LidarArtifact",
        "Mountain",
        "OtherGround",
        "ParkingMeter",
        "PavedRoad",
        "Self",
        "Sidewalk",
        "Sky",
        "StreetLight",
        "TempCone",
        "Terrain",
        "Tree",
        "Tunnel",
        "Unknown",
        "UnpavedRoad",
        "Wall",
        "Water",
        "Wire",
    ];

    TOWARDS_FRONT
        .iter()
        .map(|name| FlagPatch::new(name, LabelFlags::SHORT_AXIS_TOWARDS_FRONT))
        .chain(
            UNORIENTABLE
                .iter()
                .map(|name| FlagPatch::new(name, LabelFlags::UNORIENTABLE)),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patches_apply_to_partial_catalog() {
        let mut tree = LabelTree::new();
        tree.insert("Tree", None).unwrap();
        tree.insert("TrafficSign", None).unwrap();
        tree.insert("Building", None).unwrap();

        let applied = apply_patches(&mut tree, &default_patches());
        assert_eq!(applied, 2);
        assert!(tree
            .find_by_name("Tree")
            .unwrap()
            .flags
            .contains(LabelFlags::UNORIENTABLE));
        assert!(tree
            .find_by_name("TrafficSign")
            .unwrap()
            .flags
            .contains(LabelFlags::SHORT_AXIS_TOWARDS_FRONT));
        assert_eq!(tree.find_by_name("Building").unwrap().flags, LabelFlags::NONE);
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mut tree = LabelTree::new();
        tree.insert("Sidewalk", None).unwrap();

        let patches = default_patches();
        apply_patches(&mut tree, &patches);
        let once = tree.find_by_name("Sidewalk").unwrap().flags;
        apply_patches(&mut tree, &patches);
        assert_eq!(tree.find_by_name("Sidewalk").unwrap().flags, once);
    }

    #[test]
    fn test_load_patches_from_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("patches.json");
        fs::write(&path, r#"[{"label":"Tree","flags":2}]"#).unwrap();

        let patches = load_patches(&path).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].label, "Tree");
        assert_eq!(patches[0].flags, LabelFlags::UNORIENTABLE);
    }
}
