//! Lock-free union-find for parallel component detection.
//!
//! Roots are linked with compare-and-swap on the absorbed root's parent slot,
//! always pointing the larger root id at the smaller one. Parent ids therefore
//! strictly decrease along every path, which rules out cycles no matter how
//! unions interleave. A failed swap means another worker linked the root
//! first, and the union retries from fresh roots.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    error::PagedArrayError,
    graph::NodeId,
    paged::PagedAtomicArray,
    tracker::AllocationTracker,
};

use super::{ComponentAssignment, StorageResult, relabel};

/// Union-find whose operations take `&self` and may run on many threads.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, ConcurrentDisjointSetStruct};
/// use rayon::prelude::*;
///
/// let sets = ConcurrentDisjointSetStruct::new(6, &AllocationTracker::empty())?;
/// [(0, 1), (1, 2), (4, 5)]
///     .par_iter()
///     .try_for_each(|&(left, right)| sets.union(left, right).map(|_| ()))?;
/// assert_eq!(sets.find(2)?, 0);
/// assert_eq!(sets.set_count(), 3);
/// # Ok::<(), commune_core::PagedArrayError>(())
/// ```
#[derive(Debug)]
pub struct ConcurrentDisjointSetStruct {
    parent: PagedAtomicArray<AtomicUsize>,
    set_count: AtomicUsize,
}

impl ConcurrentDisjointSetStruct {
    /// Creates `node_count` singleton sets.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when the parent array
    /// cannot be allocated.
    pub fn new(node_count: usize, tracker: &AllocationTracker) -> StorageResult<Self> {
        let parent = PagedAtomicArray::new(node_count, tracker)?;
        parent.par_set_all(|node| node)?;
        Ok(Self {
            parent,
            set_count: AtomicUsize::new(node_count),
        })
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` when the structure holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Number of disjoint sets at the time of the call.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.set_count.load(Ordering::Acquire)
    }

    /// Returns the current root of `node`, halving the path on the way.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn find(&self, node: NodeId) -> StorageResult<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent.get(current)?;
            if parent == current {
                return Ok(current);
            }
            let grandparent = self.parent.get(parent)?;
            if grandparent != parent {
                // Losing this race only skips one shortcut.
                let _ = self.parent.compare_exchange(current, parent, grandparent)?;
            }
            current = grandparent;
        }
    }

    /// Merges the sets of `left` and `right`.
    ///
    /// Returns `false` when they already share a set.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn union(&self, left: NodeId, right: NodeId) -> StorageResult<bool> {
        loop {
            let left_root = self.find(left)?;
            let right_root = self.find(right)?;
            if left_root == right_root {
                return Ok(false);
            }
            let (survivor, absorbed) = if left_root < right_root {
                (left_root, right_root)
            } else {
                (right_root, left_root)
            };
            if self
                .parent
                .compare_exchange(absorbed, absorbed, survivor)?
                .is_ok()
            {
                self.set_count.fetch_sub(1, Ordering::AcqRel);
                return Ok(true);
            }
        }
    }

    /// Returns `true` when `left` and `right` currently share a set.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn same_set(&self, left: NodeId, right: NodeId) -> StorageResult<bool> {
        Ok(self.find(left)? == self.find(right)?)
    }

    /// Relabels every set to a dense id in `[0, set_count)`, numbered in
    /// order of each set's smallest member.
    ///
    /// # Errors
    /// Returns [`PagedArrayError`] when the output cannot be allocated.
    pub fn into_components(
        self,
        tracker: &AllocationTracker,
    ) -> Result<ComponentAssignment, PagedArrayError> {
        relabel(self.len(), tracker, |node| self.find(node))
    }
}
