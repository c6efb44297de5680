//! Materialized assignment state.
//!
//! A view over the journal: every point's current label, rebuildable at
//! any time by replaying records from the start. Exactly one active label
//! per point; assignment supersedes.

use std::collections::BTreeMap;

use surflab_types::{LabelId, PointRef};

/// Current label of every labeled point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssignmentState {
    map: BTreeMap<PointRef, LabelId>,
}

impl AssignmentState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active label of a point, if any.
    pub fn get(&self, point: PointRef) -> Option<LabelId> {
        self.map.get(&point).copied()
    }

    /// Assign a label, returning the superseded one.
    pub fn assign(&mut self, point: PointRef, label: LabelId) -> Option<LabelId> {
        self.map.insert(point, label)
    }

    /// Remove a point's label, returning it.
    pub fn unassign(&mut self, point: PointRef) -> Option<LabelId> {
        self.map.remove(&point)
    }

    /// Restore a point to a prior label (`None` = unlabeled).
    pub fn restore(&mut self, point: PointRef, prev: Option<LabelId>) {
        match prev {
            Some(label) => {
                self.map.insert(point, label);
            }
            None => {
                self.map.remove(&point);
            }
        }
    }

    /// Number of labeled points.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no point is labeled.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All (point, label) pairs in point order.
    pub fn iter(&self) -> impl Iterator<Item = (PointRef, LabelId)> + '_ {
        self.map.iter().map(|(&p, &l)| (p, l))
    }

    /// Points currently carrying the given label.
    pub fn points_with(&self, label: LabelId) -> Vec<PointRef> {
        self.map
            .iter()
            .filter(|&(_, &l)| l == label)
            .map(|(&p, _)| p)
            .collect()
    }
}
