//! Relation set reconciliation.
//!
//! Saving a list replaces its category and product relation sets. Stores
//! compute the diff between the persisted set and the requested set inside
//! their write transaction and apply only the delta.

use std::collections::BTreeSet;

/// Rows to insert and rows to delete to turn `current` into `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDiff<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T: Ord + Copy> RelationDiff<T> {
    pub fn between(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> Self {
        Self {
            to_add: desired.difference(current).copied().collect(),
            to_remove: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the diff to a set (what a store does row by row).
    pub fn apply_to(&self, set: &mut BTreeSet<T>) {
        for v in &self.to_remove {
            set.remove(v);
        }
        set.extend(self.to_add.iter().copied());
    }
}
