//! Scene handle: the store plus the label catalog seeded from it.

use std::path::Path;
use std::sync::Arc;

use surflab_store::SceneStore;

use crate::labels::LabelTree;
use crate::LabelerError;

/// An open scene: read access to blocks and the label catalog.
pub struct Scene {
    store: Arc<SceneStore>,
    labels: LabelTree,
}

impl Scene {
    /// Open a scene directory and seed the label catalog from its
    /// manifest. The store closes implicitly when the last reference
    /// drops.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LabelerError> {
        let store = Arc::new(SceneStore::open(dir)?);
        let labels = LabelTree::from_seeds(store.label_seeds())?;
        tracing::info!(
            scene = %store.name(),
            blocks = store.block_count(),
            labels = labels.len(),
            "scene opened"
        );
        Ok(Self { store, labels })
    }

    /// Shared handle to the block store.
    pub fn store(&self) -> &Arc<SceneStore> {
        &self.store
    }

    /// The label catalog.
    pub fn labels(&self) -> &LabelTree {
        &self.labels
    }

    /// Mutable access to the label catalog.
    pub fn labels_mut(&mut self) -> &mut LabelTree {
        &mut self.labels
    }
}
