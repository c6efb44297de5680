//! Snapshot manager.
//!
//! A snapshot is a full copy of the materialized assignment state,
//! written to a numbered subdirectory of the configured snapshot
//! directory. Snapshots are never overwritten: each call creates the
//! next `snapshot-NNNNNN` in sequence, resuming the numbering from
//! whatever already exists on disk. Each snapshot records the journal
//! sequence it corresponds to, so a snapshot plus the journal suffix
//! after that sequence reconstructs any later state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use surflab_types::{LabelId, PointRef};

use crate::record::now_millis;
use crate::state::AssignmentState;
use crate::SnapshotError;

/// Sidecar metadata written beside each snapshot's assignments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Snapshot number (the `NNNNNN` in the directory name).
    pub seq: u64,
    /// Unix millis at capture time.
    pub at_ms: u64,
    /// Journal sequence the snapshot corresponds to: replaying the
    /// journal up to this sequence reproduces the snapshot's state.
    pub journal_seq: u64,
}

/// One serialized assignment row.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct AssignmentRow {
    point: PointRef,
    label: LabelId,
}

/// Writes numbered, never-overwritten copies of the assignment state.
pub struct SnapshotManager {
    dir: Option<PathBuf>,
    next_seq: u64,
}

impl SnapshotManager {
    /// A manager with no directory configured; `snapshot()` fails with
    /// `NotConfigured` until one is set.
    pub fn new() -> Self {
        Self {
            dir: None,
            next_seq: 0,
        }
    }

    /// Point the manager at a directory, creating it if needed and
    /// resuming the numbering after any snapshots already present.
    pub fn set_directory(&mut self, dir: &Path) -> Result<(), SnapshotError> {
        fs::create_dir_all(dir)?;
        let mut next = 0u64;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(n) = name
                .to_str()
                .and_then(|s| s.strip_prefix("snapshot-"))
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            next = next.max(n + 1);
        }
        tracing::info!(dir = %dir.display(), next_seq = next, "snapshot directory configured");
        self.dir = Some(dir.to_path_buf());
        self.next_seq = next;
        Ok(())
    }

    /// The configured directory, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The number the next snapshot will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Write a snapshot of `state`, tagged with the journal sequence it
    /// reflects. Returns the snapshot's directory.
    pub fn snapshot(
        &mut self,
        state: &AssignmentState,
        journal_seq: u64,
    ) -> Result<PathBuf, SnapshotError> {
        let Some(base) = &self.dir else {
            return Err(SnapshotError::NotConfigured);
        };

        let seq = self.next_seq;
        let dir = base.join(format!("snapshot-{seq:06}"));
        fs::create_dir_all(&dir)?;

        let rows: Vec<AssignmentRow> = state
            .iter()
            .map(|(point, label)| AssignmentRow { point, label })
            .collect();
        fs::write(
            dir.join("assignments.json"),
            serde_json::to_vec_pretty(&rows)?,
        )?;

        let meta = SnapshotMeta {
            seq,
            at_ms: now_millis(),
            journal_seq,
        };
        fs::write(dir.join("meta.json"), serde_json::to_vec_pretty(&meta)?)?;

        self.next_seq = seq + 1;
        tracing::info!(
            dir = %dir.display(),
            journal_seq,
            points = rows.len(),
            "snapshot written"
        );
        Ok(dir)
    }

    /// Read a snapshot back from its directory.
    pub fn load(dir: &Path) -> Result<(AssignmentState, SnapshotMeta), SnapshotError> {
        let meta: SnapshotMeta = serde_json::from_slice(&fs::read(dir.join("meta.json"))?)?;
        let rows: Vec<AssignmentRow> =
            serde_json::from_slice(&fs::read(dir.join("assignments.json"))?)?;
        let mut state = AssignmentState::new();
        for row in rows {
            state.assign(row.point, row.label);
        }
        Ok((state, meta))
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}
