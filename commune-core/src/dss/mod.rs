//! Disjoint-set union over node ids.
//!
//! [`DisjointSetStruct`] is the sequential structure with a configurable
//! [`UnionStrategy`]; [`ConcurrentDisjointSetStruct`] links roots with
//! compare-and-swap so rayon workers can union in parallel. Both back
//! [`weakly_connected_components`] and relabel their roots into a dense
//! [`ComponentAssignment`].

mod concurrent;
mod wcc;

pub use self::concurrent::ConcurrentDisjointSetStruct;
pub use self::wcc::{WccConfig, weakly_connected_components};

use crate::{
    error::PagedArrayError,
    graph::NodeId,
    paged::PagedArray,
    tracker::AllocationTracker,
};

type StorageResult<T> = core::result::Result<T, PagedArrayError>;

/// How [`DisjointSetStruct::union`] decides which root survives.
///
/// Ties always keep the smaller root id.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnionStrategy {
    /// The root of the larger set survives.
    #[default]
    BySize,
    /// The root of the taller tree survives.
    ByRank,
    /// The smaller root id always survives.
    Unweighted,
}

/// Sequential union-find over `[0, len)` backed by paged storage.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, DisjointSetStruct, UnionStrategy};
///
/// let tracker = AllocationTracker::empty();
/// let mut sets = DisjointSetStruct::new(5, UnionStrategy::BySize, &tracker)?;
/// sets.union(0, 1)?;
/// sets.union(2, 3)?;
/// sets.union(1, 2)?;
/// assert!(sets.same_set(0, 3)?);
/// assert!(!sets.same_set(0, 4)?);
/// assert_eq!(sets.set_count(), 2);
/// # Ok::<(), commune_core::PagedArrayError>(())
/// ```
#[derive(Debug)]
pub struct DisjointSetStruct {
    parent: PagedArray<NodeId>,
    // set sizes for `BySize`, ranks for `ByRank`
    weight: Option<PagedArray<u64>>,
    strategy: UnionStrategy,
    set_count: usize,
}

impl DisjointSetStruct {
    /// Creates `node_count` singleton sets.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::CapacityExceeded`] when the backing arrays
    /// cannot be allocated.
    pub fn new(
        node_count: usize,
        strategy: UnionStrategy,
        tracker: &AllocationTracker,
    ) -> StorageResult<Self> {
        let mut parent = PagedArray::new(node_count, tracker)?;
        parent.par_set_all(|node| node)?;
        let weight = match strategy {
            UnionStrategy::BySize => {
                let mut sizes = PagedArray::new(node_count, tracker)?;
                sizes.fill(1)?;
                Some(sizes)
            }
            UnionStrategy::ByRank => Some(PagedArray::new(node_count, tracker)?),
            UnionStrategy::Unweighted => None,
        };
        Ok(Self {
            parent,
            weight,
            strategy,
            set_count: node_count,
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

    /// Number of disjoint sets.
    #[must_use]
    pub const fn set_count(&self) -> usize {
        self.set_count
    }

    /// Strategy used to pick surviving roots.
    #[must_use]
    pub const fn strategy(&self) -> UnionStrategy {
        self.strategy
    }

    /// Follows parent links from `node` to its root without modifying them.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn find_without_compression(&self, node: NodeId) -> StorageResult<NodeId> {
        let mut root = node;
        loop {
            let parent = self.parent.get(root)?;
            if parent == root {
                return Ok(root);
            }
            root = parent;
        }
    }

    /// Returns the root of `node`'s set and points every node on the path
    /// directly at it.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn find(&mut self, node: NodeId) -> StorageResult<NodeId> {
        let root = self.find_without_compression(node)?;
        let mut current = node;
        while current != root {
            let next = self.parent.get(current)?;
            self.parent.set(current, root)?;
            current = next;
        }
        Ok(root)
    }

    /// Stable identifier of `node`'s set; equal for every member.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn set_id_of(&mut self, node: NodeId) -> StorageResult<NodeId> {
        self.find(node)
    }

    /// Returns `true` when `left` and `right` share a set.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn same_set(&mut self, left: NodeId, right: NodeId) -> StorageResult<bool> {
        Ok(self.find(left)? == self.find(right)?)
    }

    /// Merges the sets of `left` and `right`.
    ///
    /// Returns `false` when they already share a set.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn union(&mut self, left: NodeId, right: NodeId) -> StorageResult<bool> {
        let left = self.find(left)?;
        let right = self.find(right)?;
        if left == right {
            return Ok(false);
        }
        let (low, high) = (left.min(right), left.max(right));
        let (survivor, absorbed) = match self.weight.as_mut() {
            None => (low, high),
            Some(weight) => {
                let low_weight = weight.get(low)?;
                let high_weight = weight.get(high)?;
                let (survivor, absorbed) = if high_weight > low_weight {
                    (high, low)
                } else {
                    (low, high)
                };
                match self.strategy {
                    UnionStrategy::BySize => {
                        weight.set(survivor, low_weight + high_weight)?;
                    }
                    UnionStrategy::ByRank if low_weight == high_weight => {
                        weight.add_to(survivor, 1)?;
                    }
                    UnionStrategy::ByRank | UnionStrategy::Unweighted => {}
                }
                (survivor, absorbed)
            }
        };
        self.parent.set(absorbed, survivor)?;
        self.set_count -= 1;
        Ok(true)
    }

    /// Relabels every set to a dense id in `[0, set_count)`, numbered in
    /// order of each set's smallest member.
    ///
    /// # Errors
    /// Returns [`PagedArrayError`] when the output cannot be allocated.
    pub fn into_components(
        mut self,
        tracker: &AllocationTracker,
    ) -> StorageResult<ComponentAssignment> {
        relabel(self.len(), tracker, |node| self.find(node))
    }
}

/// Dense component id for every node.
#[derive(Debug)]
pub struct ComponentAssignment {
    ids: PagedArray<usize>,
    component_count: usize,
}

impl ComponentAssignment {
    /// Component of `node`.
    ///
    /// # Errors
    /// Returns [`PagedArrayError::IndexOutOfRange`] for unknown nodes.
    pub fn component_of(&self, node: NodeId) -> StorageResult<usize> {
        self.ids.get(node)
    }

    /// Number of distinct components.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.component_count
    }

    /// Number of nodes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` when no node is covered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Borrow the per-node component ids.
    #[must_use]
    pub const fn ids(&self) -> &PagedArray<usize> {
        &self.ids
    }

    /// Consumes the assignment, returning the per-node component ids.
    #[must_use]
    pub fn into_ids(self) -> PagedArray<usize> {
        self.ids
    }
}

/// Maps each node's root to a dense id assigned in first-seen order.
pub(crate) fn relabel(
    node_count: usize,
    tracker: &AllocationTracker,
    mut root_of: impl FnMut(NodeId) -> StorageResult<NodeId>,
) -> StorageResult<ComponentAssignment> {
    let mut labels = PagedArray::<usize>::new(node_count, tracker)?;
    labels.fill(usize::MAX)?;
    let mut ids = PagedArray::<usize>::new(node_count, tracker)?;
    let mut component_count = 0;
    ids.try_set_all(|node| {
        let root = root_of(node)?;
        let mut label = labels.get(root)?;
        if label == usize::MAX {
            label = component_count;
            labels.set(root, label)?;
            component_count += 1;
        }
        Ok::<_, PagedArrayError>(label)
    })?;
    Ok(ComponentAssignment {
        ids,
        component_count,
    })
}
