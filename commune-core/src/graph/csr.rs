//! Compressed sparse row graph backed by paged arrays.

use crate::{
    error::{GraphError, PagedArrayError},
    paged::PagedArray,
    tracker::AllocationTracker,
};

use super::{Graph, NodeId};

/// Undirected graph stored as compressed sparse rows.
///
/// Row `node` spans `targets[offsets[node]..offsets[node + 1]]`. Each
/// relationship appears in the rows of both endpoints; a self-loop appears
/// twice in its node's row.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, CsrGraph, Graph};
///
/// let tracker = AllocationTracker::empty();
/// let graph = CsrGraph::from_relationships(3, &[(0, 1, 2.0), (1, 2, 0.5)], &tracker)?;
/// assert_eq!(graph.degree(1)?, 2);
/// assert_eq!(graph.relationship_count()?, 4);
///
/// let mut total = 0.0;
/// graph.for_each_relationship(1, 1.0, |_, _, weight| {
///     total += weight;
///     true
/// })?;
/// assert_eq!(total, 2.5);
/// # Ok::<(), commune_core::GraphError>(())
/// ```
#[derive(Debug)]
pub struct CsrGraph {
    node_count: usize,
    offsets: PagedArray<usize>,
    targets: PagedArray<NodeId>,
    weights: Option<PagedArray<f64>>,
}

impl CsrGraph {
    /// Builds a weighted graph from `(source, target, weight)` triples.
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidNodeId`] for endpoints outside
    /// `[0, node_count)`, [`GraphError::NonFiniteWeight`] for NaN or infinite
    /// weights, and [`GraphError::Storage`] when allocation fails.
    pub fn from_relationships(
        node_count: usize,
        relationships: &[(NodeId, NodeId, f64)],
        tracker: &AllocationTracker,
    ) -> Result<Self, GraphError> {
        build(node_count, relationships, true, tracker)
    }

    /// Builds an unweighted graph from `(source, target)` pairs.
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidNodeId`] for endpoints outside
    /// `[0, node_count)` and [`GraphError::Storage`] when allocation fails.
    pub fn from_unweighted(
        node_count: usize,
        relationships: &[(NodeId, NodeId)],
        tracker: &AllocationTracker,
    ) -> Result<Self, GraphError> {
        let triples: Vec<_> = relationships
            .iter()
            .map(|&(source, target)| (source, target, 1.0))
            .collect();
        build(node_count, &triples, false, tracker)
    }

    /// Assembles a graph from prepared rows. `offsets` must hold
    /// `node_count + 1` non-decreasing entries ending at `targets.len()`.
    pub(crate) fn from_parts(
        offsets: PagedArray<usize>,
        targets: PagedArray<NodeId>,
        weights: Option<PagedArray<f64>>,
    ) -> Self {
        Self {
            node_count: offsets.len().saturating_sub(1),
            offsets,
            targets,
            weights,
        }
    }

    /// Returns `true` when relationships carry explicit weights.
    #[must_use]
    pub const fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// Bytes reserved by the offsets, targets and weights.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.offsets.size_in_bytes()
            + self.targets.size_in_bytes()
            + self.weights.as_ref().map_or(0, PagedArray::size_in_bytes)
    }

    fn row(&self, node: NodeId) -> Result<(usize, usize), GraphError> {
        if node >= self.node_count {
            return Err(GraphError::InvalidNodeId {
                node,
                node_count: self.node_count,
            });
        }
        Ok((self.offsets.get(node)?, self.offsets.get(node + 1)?))
    }
}

impl Graph for CsrGraph {
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn degree(&self, node: NodeId) -> Result<usize, GraphError> {
        let (start, end) = self.row(node)?;
        Ok(end - start)
    }

    fn for_each_relationship<F>(
        &self,
        node: NodeId,
        default_weight: f64,
        mut visitor: F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(NodeId, NodeId, f64) -> bool,
    {
        let (start, end) = self.row(node)?;
        for entry in start..end {
            let target = self.targets.get(entry)?;
            let weight = match &self.weights {
                Some(weights) => weights.get(entry)?,
                None => default_weight,
            };
            if !visitor(node, target, weight) {
                break;
            }
        }
        Ok(())
    }

    fn relationship_count(&self) -> Result<usize, GraphError> {
        Ok(self.targets.len())
    }
}

/// Incrementally collects relationships for a [`CsrGraph`].
///
/// Validation is deferred to [`CsrGraphBuilder::build`], so relationships may
/// be added in any order.
///
/// # Examples
/// ```
/// use commune_core::{CsrGraphBuilder, Graph};
///
/// let mut builder = CsrGraphBuilder::new(2);
/// builder.add_relationship(0, 1).add_relationship(1, 1);
/// let graph = builder.build()?;
/// assert_eq!(graph.degree(1)?, 3);
/// assert!(!graph.has_weights());
/// # Ok::<(), commune_core::GraphError>(())
/// ```
#[derive(Clone, Debug)]
pub struct CsrGraphBuilder {
    node_count: usize,
    relationships: Vec<(NodeId, NodeId, f64)>,
    weighted: bool,
    tracker: AllocationTracker,
}

impl CsrGraphBuilder {
    /// Creates a builder for a graph with `node_count` nodes.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            relationships: Vec::new(),
            weighted: false,
            tracker: AllocationTracker::empty(),
        }
    }

    /// Records the graph's storage against `tracker`.
    #[must_use]
    pub fn with_tracker(mut self, tracker: AllocationTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Adds an undirected relationship with weight 1.0.
    pub fn add_relationship(&mut self, source: NodeId, target: NodeId) -> &mut Self {
        self.relationships.push((source, target, 1.0));
        self
    }

    /// Adds an undirected weighted relationship and makes the graph weighted.
    pub fn add_weighted_relationship(
        &mut self,
        source: NodeId,
        target: NodeId,
        weight: f64,
    ) -> &mut Self {
        self.weighted = true;
        self.relationships.push((source, target, weight));
        self
    }

    /// Number of relationships added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Returns `true` when no relationship has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Validates the relationships and builds the graph.
    ///
    /// # Errors
    /// See [`CsrGraph::from_relationships`].
    pub fn build(&self) -> Result<CsrGraph, GraphError> {
        build(
            self.node_count,
            &self.relationships,
            self.weighted,
            &self.tracker,
        )
    }
}

fn build(
    node_count: usize,
    relationships: &[(NodeId, NodeId, f64)],
    weighted: bool,
    tracker: &AllocationTracker,
) -> Result<CsrGraph, GraphError> {
    for &(source, target, weight) in relationships {
        for node in [source, target] {
            if node >= node_count {
                return Err(GraphError::InvalidNodeId { node, node_count });
            }
        }
        if !weight.is_finite() {
            return Err(GraphError::NonFiniteWeight {
                source_node: source,
                target_node: target,
                weight,
            });
        }
    }

    let offset_count = node_count
        .checked_add(1)
        .ok_or(PagedArrayError::CapacityExceeded {
            requested: node_count,
            limit: usize::MAX - 1,
        })?;
    let mut offsets = PagedArray::<usize>::new(offset_count, tracker)?;
    for &(source, target, _) in relationships {
        offsets.add_to(source + 1, 1)?;
        offsets.add_to(target + 1, 1)?;
    }
    for index in 1..=node_count {
        let previous = offsets.get(index - 1)?;
        offsets.add_to(index, previous)?;
    }

    let entry_count = relationships.len() * 2;
    let mut targets = PagedArray::<NodeId>::new(entry_count, tracker)?;
    let mut weights = if weighted {
        Some(PagedArray::<f64>::new(entry_count, tracker)?)
    } else {
        None
    };
    let mut cursor = PagedArray::<usize>::new(node_count, tracker)?;
    cursor.try_set_all(|node| offsets.get(node))?;
    for &(source, target, weight) in relationships {
        for (from, to) in [(source, target), (target, source)] {
            let slot = cursor.get(from)?;
            cursor.set(from, slot + 1)?;
            targets.set(slot, to)?;
            if let Some(weights) = weights.as_mut() {
                weights.set(slot, weight)?;
            }
        }
    }
    Ok(CsrGraph::from_parts(offsets, targets, weights))
}
