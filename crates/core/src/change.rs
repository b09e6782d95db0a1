//! Change notifications for live result sets.
//!
//! A `CollectionChange` describes how a result set moved between two
//! notifications: which positions were inserted, which were modified in place,
//! and which were deleted.

use alloc::vec::Vec;

/// Index-bearing description of a result set change.
///
/// - `insertions`: positions in the new result that did not exist before
/// - `modifications`: positions in the new result whose object changed
/// - `deletions`: positions in the old result that are gone
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionChange {
    /// Indices of inserted objects (new result)
    pub insertions: Vec<usize>,
    /// Indices of modified objects (new result)
    pub modifications: Vec<usize>,
    /// Indices of deleted objects (old result)
    pub deletions: Vec<usize>,
}

impl CollectionChange {
    /// Creates a new empty change.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing was inserted, modified or deleted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.modifications.is_empty() && self.deletions.is_empty()
    }

    /// Returns the total number of changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.insertions.len() + self.modifications.len() + self.deletions.len()
    }

    /// Records an inserted position.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        self.insertions.push(index);
    }

    /// Records a modified position.
    #[inline]
    pub fn modify(&mut self, index: usize) {
        self.modifications.push(index);
    }

    /// Records a deleted position.
    #[inline]
    pub fn delete(&mut self, index: usize) {
        self.deletions.push(index);
    }
}
