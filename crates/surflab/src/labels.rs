//! The label tree — hierarchical catalog of label categories.
//!
//! Labels are looked up by id (insertion-ordered map) or by name (hash
//! index) in near-constant time. The tree is derived state: assignments
//! live in the journal, the catalog here only describes the categories
//! and their behavior flags. Cycles are impossible by construction —
//! inserts attach to an existing parent, and `reparent` refuses to move
//! a label under its own descendant.

use std::collections::HashMap;

use indexmap::IndexMap;

use surflab_store::LabelSeed;
use surflab_types::{LabelFlags, LabelId};

use crate::LabelError;

/// One label category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    /// Catalog id, unique within the tree.
    pub id: LabelId,
    /// Unique name.
    pub name: String,
    /// Parent category; `None` for roots.
    pub parent: Option<LabelId>,
    /// Behavior flags consumed by rendering/export.
    pub flags: LabelFlags,
}

/// The catalog of labels, with name and id lookup.
#[derive(Default)]
pub struct LabelTree {
    labels: IndexMap<LabelId, Label>,
    by_name: HashMap<String, LabelId>,
    next_id: u32,
}

impl LabelTree {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from the seed labels of a scene manifest.
    ///
    /// Seeds carry their own ids; new labels inserted afterwards get ids
    /// above the largest seed id.
    pub fn from_seeds(seeds: &[LabelSeed]) -> Result<Self, LabelError> {
        let mut tree = Self::new();
        for seed in seeds {
            if tree.labels.contains_key(&seed.id) {
                return Err(LabelError::Duplicate(format!(
                    "seed id {} ({})",
                    seed.id, seed.name
                )));
            }
            if tree.by_name.contains_key(&seed.name) {
                return Err(LabelError::Duplicate(seed.name.clone()));
            }
            tree.by_name.insert(seed.name.clone(), seed.id);
            tree.labels.insert(
                seed.id,
                Label {
                    id: seed.id,
                    name: seed.name.clone(),
                    parent: seed.parent,
                    flags: seed.flags,
                },
            );
            tree.next_id = tree.next_id.max(seed.id.raw() + 1);
        }
        // Parents may be seeded in any order; validate after the fact.
        for label in tree.labels.values() {
            if let Some(parent) = label.parent {
                if !tree.labels.contains_key(&parent) {
                    return Err(LabelError::NotFound(format!(
                        "parent {} of label {}",
                        parent, label.name
                    )));
                }
            }
        }
        Ok(tree)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Insert a new label under the given parent.
    pub fn insert(&mut self, name: &str, parent: Option<LabelId>) -> Result<LabelId, LabelError> {
        if self.by_name.contains_key(name) {
            return Err(LabelError::Duplicate(name.to_string()));
        }
        if let Some(parent) = parent {
            if !self.labels.contains_key(&parent) {
                return Err(LabelError::NotFound(format!("parent {parent}")));
            }
        }
        let id = LabelId::new(self.next_id);
        self.next_id += 1;
        self.by_name.insert(name.to_string(), id);
        self.labels.insert(
            id,
            Label {
                id,
                name: name.to_string(),
                parent,
                flags: LabelFlags::NONE,
            },
        );
        Ok(id)
    }

    /// Look up a label by id.
    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    /// Look up a label by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Label> {
        self.by_name.get(name).and_then(|id| self.labels.get(id))
    }

    /// Add flags to a named label. Idempotent; an absent name is a silent
    /// no-op (flag-patch configuration runs against scenes that may lack
    /// some labels). Returns whether the label existed.
    pub fn add_flags_by_name(&mut self, name: &str, flags: LabelFlags) -> bool {
        let Some(&id) = self.by_name.get(name) else {
            return false;
        };
        if let Some(label) = self.labels.get_mut(&id) {
            label.flags.insert(flags);
        }
        true
    }

    /// Move a label under a new parent (`None` = make it a root).
    ///
    /// Fails with `InvalidOperation` if the new parent is the label
    /// itself or one of its descendants; the tree is unchanged on error.
    pub fn reparent(&mut self, id: LabelId, new_parent: Option<LabelId>) -> Result<(), LabelError> {
        if !self.labels.contains_key(&id) {
            return Err(LabelError::NotFound(format!("label {id}")));
        }
        if let Some(parent) = new_parent {
            if !self.labels.contains_key(&parent) {
                return Err(LabelError::NotFound(format!("parent {parent}")));
            }
            if parent == id || self.is_descendant(parent, id) {
                return Err(LabelError::InvalidOperation(format!(
                    "cannot move label {id} under its own descendant {parent}"
                )));
            }
        }
        if let Some(label) = self.labels.get_mut(&id) {
            label.parent = new_parent;
        }
        Ok(())
    }

    /// Whether `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: LabelId, ancestor: LabelId) -> bool {
        let mut cursor = self.labels.get(&candidate).and_then(|l| l.parent);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.labels.get(&id).and_then(|l| l.parent);
        }
        false
    }

    /// Direct children of a label, in insertion order.
    pub fn children(&self, id: LabelId) -> Vec<LabelId> {
        self.labels
            .values()
            .filter(|l| l.parent == Some(id))
            .map(|l| l.id)
            .collect()
    }

    /// All labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }
}
