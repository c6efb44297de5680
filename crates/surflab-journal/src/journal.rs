//! The edit history journal.
//!
//! Append-only JSONL file, one record per line, sequence number = line
//! index. Write-ahead ordering: a record is flushed and synced to disk
//! before the in-memory mutation it describes is applied, so a crash
//! between "decide" and "apply" never loses an edit the user saw, and
//! never applies an edit that was not journaled. A failed write leaves
//! the materialized state untouched — the operation never partially
//! succeeds.
//!
//! Undo/redo move a cursor over assignment records and are journaled
//! themselves, so full replay (crash recovery) reproduces the exact
//! cursor-adjusted state. A new assignment while the cursor is rewound
//! truncates the redo tail, as an interactive editor expects.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use surflab_types::{LabelId, PointRef};

use crate::lock::SessionLock;
use crate::record::{now_millis, HistoryRecord, PointChange};
use crate::state::AssignmentState;
use crate::JournalError;

/// Append-only, replayable log of label edits.
#[derive(Debug)]
pub struct EditJournal {
    file: Option<File>,
    path: Option<PathBuf>,
    _lock: Option<SessionLock>,
    records: Vec<HistoryRecord>,
    /// Indices into `records` of assign records, redo tail included.
    assigns: Vec<usize>,
    /// Number of assigns currently applied to the materialized state.
    cursor: usize,
}

impl EditJournal {
    /// Open a journal.
    ///
    /// With a path: acquires the session lock, replays any existing
    /// records (crash recovery), and positions appends at the end. A
    /// truncated final line — the signature of a crash mid-append — is
    /// dropped and trimmed from the file; corruption anywhere else is an
    /// error. Without a path the journal is memory-only and edits do not
    /// survive a crash; callers must surface that to the operator.
    pub fn open(path: Option<&Path>) -> Result<(Self, AssignmentState), JournalError> {
        let Some(path) = path else {
            tracing::warn!("no journal path configured; edits will not survive a crash");
            return Ok((
                Self {
                    file: None,
                    path: None,
                    _lock: None,
                    records: Vec::new(),
                    assigns: Vec::new(),
                    cursor: 0,
                },
                AssignmentState::new(),
            ));
        };

        let lock = SessionLock::acquire(path)?;

        let mut records = Vec::new();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut offset = 0usize;
            let mut truncate_at = None;
            for (i, line) in content.split_inclusive('\n').enumerate() {
                let trimmed = line.trim_end_matches(['\n', '\r']);
                if trimmed.is_empty() {
                    offset += line.len();
                    continue;
                }
                let parsed: Result<HistoryRecord, _> = serde_json::from_str(trimmed);
                match parsed {
                    Ok(record) if record.seq() == records.len() as u64 => {
                        records.push(record);
                        offset += line.len();
                    }
                    Ok(record) => {
                        return Err(JournalError::Corrupt {
                            line: i + 1,
                            detail: format!(
                                "sequence {} at line {} (expected {})",
                                record.seq(),
                                i + 1,
                                records.len()
                            ),
                        });
                    }
                    Err(e) => {
                        let is_tail = offset + line.len() == content.len();
                        if is_tail {
                            tracing::warn!(
                                line = i + 1,
                                error = %e,
                                "dropping truncated journal tail from interrupted append"
                            );
                            truncate_at = Some(offset as u64);
                            break;
                        }
                        return Err(JournalError::Corrupt {
                            line: i + 1,
                            detail: e.to_string(),
                        });
                    }
                }
            }
            if let Some(len) = truncate_at {
                OpenOptions::new().write(true).open(path)?.set_len(len)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (state, assigns, cursor) = apply_records(&records);
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            applied = cursor,
            "journal opened"
        );
        Ok((
            Self {
                file: Some(file),
                path: Some(path.to_path_buf()),
                _lock: Some(lock),
                records,
                assigns,
                cursor,
            },
            state,
        ))
    }

    /// Whether edits survive a crash.
    pub fn is_durable(&self) -> bool {
        self.file.is_some()
    }

    /// The journal file's path, if durable.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records, including cursor moves.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the journal has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The sequence number the next record will get.
    pub fn next_seq(&self) -> u64 {
        self.records.len() as u64
    }

    /// All records, in order.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Whether there is an assignment to undo.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether there is an undone assignment to redo.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.assigns.len()
    }

    /// Journal and apply one assignment.
    ///
    /// Prior labels of the affected points are captured into the record
    /// so undo is exact. The record is durable before `state` changes;
    /// on write failure `state` is untouched.
    pub fn append_assign(
        &mut self,
        state: &mut AssignmentState,
        label: LabelId,
        points: &[PointRef],
        editor: &str,
    ) -> Result<u64, JournalError> {
        let seq = self.next_seq();
        let changes: Vec<PointChange> = points
            .iter()
            .map(|&p| PointChange {
                point: p,
                prev: state.get(p),
            })
            .collect();
        let record = HistoryRecord::Assign {
            seq,
            label,
            points: changes,
            editor: editor.to_string(),
            at_ms: now_millis(),
        };
        self.write_record(&record)?;

        for point in points {
            state.assign(*point, label);
        }
        // A new edit while rewound abandons the redo tail.
        self.assigns.truncate(self.cursor);
        self.records.push(record);
        self.assigns.push(self.records.len() - 1);
        self.cursor = self.assigns.len();
        Ok(seq)
    }

    /// Undo the most recent applied assignment. Returns `false` (and
    /// journals nothing) when there is nothing to undo.
    pub fn undo(&mut self, state: &mut AssignmentState) -> Result<bool, JournalError> {
        if self.cursor == 0 {
            return Ok(false);
        }
        let record = HistoryRecord::Undo {
            seq: self.next_seq(),
            at_ms: now_millis(),
        };
        self.write_record(&record)?;
        self.records.push(record);

        self.cursor -= 1;
        if let HistoryRecord::Assign { points, .. } = &self.records[self.assigns[self.cursor]] {
            for change in points {
                state.restore(change.point, change.prev);
            }
        }
        Ok(true)
    }

    /// Re-apply the most recently undone assignment. Returns `false`
    /// (and journals nothing) when there is nothing to redo.
    pub fn redo(&mut self, state: &mut AssignmentState) -> Result<bool, JournalError> {
        if self.cursor >= self.assigns.len() {
            return Ok(false);
        }
        let record = HistoryRecord::Redo {
            seq: self.next_seq(),
            at_ms: now_millis(),
        };
        self.write_record(&record)?;
        self.records.push(record);

        if let HistoryRecord::Assign { label, points, .. } =
            &self.records[self.assigns[self.cursor]]
        {
            for change in points {
                state.assign(change.point, *label);
            }
        }
        self.cursor += 1;
        Ok(true)
    }

    /// Rebuild materialized state from scratch by applying records
    /// `0..upto` in order. Deterministic and idempotent.
    pub fn replay(&self, upto: u64) -> Result<AssignmentState, JournalError> {
        let n = upto as usize;
        if n > self.records.len() {
            return Err(JournalError::OutOfRange {
                seq: upto,
                len: self.records.len(),
            });
        }
        Ok(apply_records(&self.records[..n]).0)
    }

    /// Flush and sync the journal, releasing the session lock.
    pub fn close(mut self) -> Result<(), JournalError> {
        if let Some(file) = &mut self.file {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn write_record(&mut self, record: &HistoryRecord) -> Result<(), JournalError> {
        let Some(file) = &mut self.file else {
            return Ok(());
        };
        let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

/// Replay records into a fresh state, also producing the assign index
/// and cursor position. Shared by `open` and `replay`.
fn apply_records(records: &[HistoryRecord]) -> (AssignmentState, Vec<usize>, usize) {
    let mut state = AssignmentState::new();
    let mut assigns: Vec<usize> = Vec::new();
    let mut cursor = 0usize;

    for (idx, record) in records.iter().enumerate() {
        match record {
            HistoryRecord::Assign { label, points, .. } => {
                assigns.truncate(cursor);
                for change in points {
                    state.assign(change.point, *label);
                }
                assigns.push(idx);
                cursor = assigns.len();
            }
            HistoryRecord::Undo { .. } => {
                if cursor > 0 {
                    cursor -= 1;
                    if let HistoryRecord::Assign { points, .. } = &records[assigns[cursor]] {
                        for change in points {
                            state.restore(change.point, change.prev);
                        }
                    }
                }
            }
            HistoryRecord::Redo { .. } => {
                if cursor < assigns.len() {
                    if let HistoryRecord::Assign { label, points, .. } = &records[assigns[cursor]]
                    {
                        for change in points {
                            state.assign(change.point, *label);
                        }
                    }
                    cursor += 1;
                }
            }
        }
    }

    (state, assigns, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use surflab_types::BlockId;

    const TREE: LabelId = LabelId::new(1);
    const SIDEWALK: LabelId = LabelId::new(2);
    const WIRE: LabelId = LabelId::new(3);

    fn p(block: u64, index: u32) -> PointRef {
        PointRef::new(BlockId::new(block), index)
    }

    /// p1 -> Tree, p2 -> Sidewalk, p1 -> Wire.
    fn seeded() -> (EditJournal, AssignmentState) {
        let (mut journal, mut state) = EditJournal::open(None).unwrap();
        journal
            .append_assign(&mut state, TREE, &[p(0, 1)], "amy")
            .unwrap();
        journal
            .append_assign(&mut state, SIDEWALK, &[p(0, 2)], "amy")
            .unwrap();
        journal
            .append_assign(&mut state, WIRE, &[p(0, 1)], "amy")
            .unwrap();
        (journal, state)
    }

    #[test]
    fn test_replay_scenario() {
        let (journal, _state) = seeded();

        let at2 = journal.replay(2).unwrap();
        assert_eq!(at2.get(p(0, 1)), Some(TREE));
        assert_eq!(at2.get(p(0, 2)), Some(SIDEWALK));

        let at3 = journal.replay(3).unwrap();
        assert_eq!(at3.get(p(0, 1)), Some(WIRE));
        assert_eq!(at3.get(p(0, 2)), Some(SIDEWALK));
    }

    #[test]
    fn test_undo_from_seq_3_restores_tree() {
        let (mut journal, mut state) = seeded();
        assert!(journal.undo(&mut state).unwrap());
        assert_eq!(state.get(p(0, 1)), Some(TREE));
        assert_eq!(state.get(p(0, 2)), Some(SIDEWALK));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let (journal, _state) = seeded();
        let a = journal.replay(3).unwrap();
        let b = journal.replay(3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_replay_matches_live_state() {
        let (mut journal, mut state) = seeded();
        journal.undo(&mut state).unwrap();
        journal.redo(&mut state).unwrap();
        let replayed = journal.replay(journal.next_seq()).unwrap();
        assert_eq!(replayed, state);
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let (mut journal, mut state) = seeded();
        assert!(journal.undo(&mut state).unwrap());
        assert!(journal.redo(&mut state).unwrap());
        assert_eq!(state.get(p(0, 1)), Some(WIRE));
    }

    #[test]
    fn test_undo_past_first_is_noop() {
        let (mut journal, mut state) = EditJournal::open(None).unwrap();
        assert!(!journal.undo(&mut state).unwrap());
        assert_eq!(journal.len(), 0, "no-op undo must not be journaled");
    }

    #[test]
    fn test_redo_past_last_is_noop() {
        let (mut journal, mut state) = seeded();
        let len = journal.len();
        assert!(!journal.redo(&mut state).unwrap());
        assert_eq!(journal.len(), len);
    }

    #[test]
    fn test_new_edit_truncates_redo_tail() {
        let (mut journal, mut state) = seeded();
        journal.undo(&mut state).unwrap();
        journal
            .append_assign(&mut state, SIDEWALK, &[p(0, 1)], "amy")
            .unwrap();
        assert!(!journal.can_redo());
        assert!(!journal.redo(&mut state).unwrap());
        assert_eq!(state.get(p(0, 1)), Some(SIDEWALK));
    }

    #[test]
    fn test_durable_reopen_recovers_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");

        {
            let (mut journal, mut state) = EditJournal::open(Some(&path)).unwrap();
            assert!(journal.is_durable());
            journal
                .append_assign(&mut state, TREE, &[p(0, 1)], "amy")
                .unwrap();
            journal
                .append_assign(&mut state, SIDEWALK, &[p(0, 2)], "amy")
                .unwrap();
            journal.undo(&mut state).unwrap();
            journal.close().unwrap();
        }

        let (journal, state) = EditJournal::open(Some(&path)).unwrap();
        assert_eq!(journal.len(), 3);
        assert_eq!(state.get(p(0, 1)), Some(TREE));
        assert_eq!(state.get(p(0, 2)), None, "undo must survive reopen");
        assert!(journal.can_redo());
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");

        {
            let (mut journal, mut state) = EditJournal::open(Some(&path)).unwrap();
            journal
                .append_assign(&mut state, TREE, &[p(0, 1)], "amy")
                .unwrap();
            journal.close().unwrap();
        }
        // Simulate a crash mid-append: partial JSON, no newline.
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"{\"op\":\"assign\",\"seq\":1,\"lab").unwrap();
        }

        let (mut journal, mut state) = EditJournal::open(Some(&path)).unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(state.get(p(0, 1)), Some(TREE));

        // The trimmed file accepts new appends cleanly.
        journal
            .append_assign(&mut state, WIRE, &[p(0, 1)], "amy")
            .unwrap();
        drop(journal);
        let (journal, state) = EditJournal::open(Some(&path)).unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(state.get(p(0, 1)), Some(WIRE));
    }

    #[test]
    fn test_corrupt_interior_line_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");
        fs::write(&path, "garbage\n{\"op\":\"undo\",\"seq\":0,\"at_ms\":0}\n").unwrap();

        let err = EditJournal::open(Some(&path)).unwrap_err();
        assert!(matches!(err, JournalError::Corrupt { line: 1, .. }));
    }

    #[test]
    fn test_sequence_mismatch_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");
        fs::write(&path, "{\"op\":\"undo\",\"seq\":5,\"at_ms\":0}\n").unwrap();

        let err = EditJournal::open(Some(&path)).unwrap_err();
        assert!(matches!(err, JournalError::Corrupt { .. }));
    }

    #[test]
    fn test_replay_out_of_range() {
        let (journal, _state) = seeded();
        let err = journal.replay(99).unwrap_err();
        assert!(matches!(err, JournalError::OutOfRange { seq: 99, len: 3 }));
    }

    #[test]
    fn test_lock_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.jsonl");

        let (_journal, _state) = EditJournal::open(Some(&path)).unwrap();
        let err = EditJournal::open(Some(&path)).unwrap_err();
        assert!(matches!(err, JournalError::AlreadyOpen(_)));
    }

    #[test]
    fn test_memory_only_journal_is_not_durable() {
        let (journal, _state) = EditJournal::open(None).unwrap();
        assert!(!journal.is_durable());
        assert!(journal.path().is_none());
    }
}
