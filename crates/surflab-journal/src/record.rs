//! Journal records.
//!
//! Every record is immutable once written and carries its own sequence
//! number (equal to its line index). Undo and redo are records too: a
//! crash right after an undo recovers the undone state, because replaying
//! the full journal replays the cursor movement.

use serde::{Deserialize, Serialize};

use surflab_types::{LabelId, PointRef};

/// The label a point carried before an assignment, captured at append
/// time so undo is exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointChange {
    /// The point that changed.
    pub point: PointRef,
    /// Its label before the assignment (`None` = unlabeled).
    pub prev: Option<LabelId>,
}

/// One line of the journal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HistoryRecord {
    /// Assign `label` to every point in `points`, superseding each
    /// point's previous label.
    Assign {
        /// Sequence number (= line index).
        seq: u64,
        /// The label assigned.
        label: LabelId,
        /// Affected points with their prior labels.
        points: Vec<PointChange>,
        /// Who made the edit.
        editor: String,
        /// Unix millis.
        at_ms: u64,
    },
    /// Move the undo cursor back one assignment.
    Undo {
        /// Sequence number (= line index).
        seq: u64,
        /// Unix millis.
        at_ms: u64,
    },
    /// Move the undo cursor forward one assignment.
    Redo {
        /// Sequence number (= line index).
        seq: u64,
        /// Unix millis.
        at_ms: u64,
    },
}

impl HistoryRecord {
    /// The record's sequence number.
    pub fn seq(&self) -> u64 {
        match self {
            HistoryRecord::Assign { seq, .. }
            | HistoryRecord::Undo { seq, .. }
            | HistoryRecord::Redo { seq, .. } => *seq,
        }
    }

    /// Whether this record is an assignment (vs. a cursor move).
    pub fn is_assign(&self) -> bool {
        matches!(self, HistoryRecord::Assign { .. })
    }
}

/// Current time in milliseconds since Unix epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surflab_types::BlockId;

    #[test]
    fn test_record_json_roundtrip() {
        let record = HistoryRecord::Assign {
            seq: 3,
            label: LabelId::new(7),
            points: vec![PointChange {
                point: PointRef::new(BlockId::new(1), 42),
                prev: Some(LabelId::new(2)),
            }],
            editor: "amy".to_string(),
            at_ms: 1_700_000_000_000,
        };
        let line = serde_json::to_string(&record).unwrap();
        let back: HistoryRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_record_tags() {
        let undo = HistoryRecord::Undo { seq: 1, at_ms: 0 };
        let line = serde_json::to_string(&undo).unwrap();
        assert!(line.contains("\"op\":\"undo\""));
        assert!(!undo.is_assign());
        assert_eq!(undo.seq(), 1);
    }
}
