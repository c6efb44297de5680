//! The labeling session facade.
//!
//! One `Labeler` ties the subsystems together for a single operator
//! session: the scene (store + label catalog), the resolution cache
//! feeding the renderer, the write-ahead journal holding every edit,
//! and the snapshot manager. The UI/render loop drives it per frame
//! (`update_focus` / `commit_loaded`) and per edit (`assign` / `undo` /
//! `redo`); everything else is setup and teardown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use surflab_cache::{CacheMode, ResolutionCache};
use surflab_journal::{AssignmentState, EditJournal, SnapshotManager};
use surflab_types::{LabelId, PointRef, SessionId};

use crate::labels::LabelTree;
use crate::patch::{apply_patches, default_patches, FlagPatch};
use crate::scene::Scene;
use crate::{LabelError, LabelerError};

/// Session configuration, typically filled from the command line.
pub struct LabelerConfig {
    /// Journal file. `None` runs the session without crash durability.
    pub history: Option<PathBuf>,
    /// Snapshot directory, configurable later via
    /// [`Labeler::set_snapshot_directory`].
    pub snapshot_directory: Option<PathBuf>,
    /// Dynamic (focus-driven) residency instead of eager static load.
    pub dynamic_cache: bool,
    /// Focus-driven multiresolution refinement. Off = everything at full
    /// resolution, no radius culling.
    pub multiresolution: bool,
    /// Dynamic-mode memory ceiling override, in bytes.
    pub memory_ceiling: Option<u64>,
    /// Flag patches enforced on the catalog at open.
    pub flag_patches: Vec<FlagPatch>,
    /// Recorded in every journal record.
    pub editor: String,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            history: None,
            snapshot_directory: None,
            dynamic_cache: false,
            multiresolution: false,
            memory_ceiling: None,
            flag_patches: default_patches(),
            editor: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// An active labeling session over one scene.
pub struct Labeler {
    scene: Scene,
    cache: ResolutionCache,
    journal: EditJournal,
    state: AssignmentState,
    snapshots: SnapshotManager,
    session: SessionId,
    editor: String,
}

impl Labeler {
    /// Open a scene and start a session.
    ///
    /// Static cache mode eagerly loads every block at its coarsest level
    /// before returning; dynamic mode starts empty and converges on the
    /// focus. An existing journal at the history path is replayed so the
    /// session resumes exactly where the last one stopped.
    pub fn open(scene_dir: impl AsRef<Path>, config: LabelerConfig) -> Result<Self, LabelerError> {
        let mut scene = Scene::open(scene_dir)?;
        let patched = apply_patches(scene.labels_mut(), &config.flag_patches);
        tracing::debug!(patched, "label flag patches applied");

        let mode = if config.dynamic_cache {
            CacheMode::Dynamic
        } else {
            CacheMode::Static
        };
        let mut cache = ResolutionCache::new(Arc::clone(scene.store()), mode)?;
        if let Some(bytes) = config.memory_ceiling {
            cache.set_memory_ceiling(bytes);
        }
        if !config.multiresolution {
            cache.set_focus_radius(f32::INFINITY);
            cache.set_target_resolution(f32::INFINITY);
        }
        if mode == CacheMode::Static {
            cache.read_coarsest_blocks(f64::INFINITY)?;
        }

        let (journal, state) = EditJournal::open(config.history.as_deref())?;

        let mut snapshots = SnapshotManager::new();
        if let Some(dir) = &config.snapshot_directory {
            snapshots.set_directory(dir)?;
        }

        let session = SessionId::new();
        tracing::info!(
            session = %session.short(),
            mode = %mode,
            durable = journal.is_durable(),
            recovered = journal.len(),
            "labeling session started"
        );
        Ok(Self {
            scene,
            cache,
            journal,
            state,
            snapshots,
            session,
            editor: config.editor,
        })
    }

    /// This session's id.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether edits survive a crash.
    pub fn is_durable(&self) -> bool {
        self.journal.is_durable()
    }

    /// The label catalog.
    pub fn labels(&self) -> &LabelTree {
        self.scene.labels()
    }

    /// Mutable access to the label catalog.
    pub fn labels_mut(&mut self) -> &mut LabelTree {
        self.scene.labels_mut()
    }

    /// The materialized assignment state.
    pub fn state(&self) -> &AssignmentState {
        &self.state
    }

    /// The journal, for inspection and replay.
    pub fn journal(&self) -> &EditJournal {
        &self.journal
    }

    /// The resolution cache, for the renderer's working set.
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The active label of a point, if any.
    pub fn label_of(&self, point: PointRef) -> Option<LabelId> {
        self.state.get(point)
    }

    /// Assign a label to a set of points. Journaled before applied; on a
    /// journal write failure the state is untouched and the error is
    /// surfaced. Returns the edit's journal sequence.
    pub fn assign(&mut self, label: LabelId, points: &[PointRef]) -> Result<u64, LabelerError> {
        if self.scene.labels().get(label).is_none() {
            return Err(LabelError::NotFound(format!("label {label}")).into());
        }
        for point in points {
            // Required lookup: an edit against a nonexistent block is an
            // error, not advisory.
            self.scene.store().block(point.block)?;
        }
        let seq = self
            .journal
            .append_assign(&mut self.state, label, points, &self.editor)?;
        tracing::debug!(seq, %label, points = points.len(), "assignment journaled");
        Ok(seq)
    }

    /// Undo the most recent assignment. `false` if there is nothing to
    /// undo.
    pub fn undo(&mut self) -> Result<bool, LabelerError> {
        Ok(self.journal.undo(&mut self.state)?)
    }

    /// Redo the most recently undone assignment. `false` if there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool, LabelerError> {
        Ok(self.journal.redo(&mut self.state)?)
    }

    /// Per-frame: recompute desired residency for the focus point.
    pub fn update_focus(&mut self, focus: [f32; 3]) {
        self.cache.update_focus(focus);
    }

    /// Per-frame: apply finished background loads.
    pub fn commit_loaded(&mut self) {
        self.cache.commit_loaded();
    }

    /// Set the focus radius (`INFINITY` = no radius culling).
    pub fn set_focus_radius(&mut self, radius: f32) {
        self.cache.set_focus_radius(radius);
    }

    /// Set the target on-screen resolution (`INFINITY` = finest).
    pub fn set_target_resolution(&mut self, target: f32) {
        self.cache.set_target_resolution(target);
    }

    /// Eagerly load coarsest levels until `budget` bytes are resident.
    pub fn read_coarsest_blocks(&mut self, budget: f64) -> Result<usize, LabelerError> {
        Ok(self.cache.read_coarsest_blocks(budget)?)
    }

    /// Configure (or move) the snapshot directory.
    pub fn set_snapshot_directory(&mut self, dir: &Path) -> Result<(), LabelerError> {
        Ok(self.snapshots.set_directory(dir)?)
    }

    /// Write a snapshot of the current assignment state, tagged with the
    /// journal sequence it reflects.
    pub fn snapshot(&mut self) -> Result<PathBuf, LabelerError> {
        Ok(self.snapshots.snapshot(&self.state, self.journal.next_seq())?)
    }

    /// Graceful shutdown: abandon outstanding loads, flush and sync the
    /// journal, release the session lock and the scene.
    pub fn terminate(mut self) -> Result<(), LabelerError> {
        self.cache.close();
        tracing::info!(session = %self.session.short(), "labeling session terminated");
        self.journal.close()?;
        Ok(())
    }
}
