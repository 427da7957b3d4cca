//! Read-only graph access for community detection.
//!
//! Algorithms consume graphs only through [`Graph`]: a node count, per-node
//! degrees, and a visitor over each node's relationships. Every undirected
//! relationship is visible from both endpoints, and a self-loop is reported
//! twice by its node, so the sum of all visited weights is `2m`.

mod csr;

pub use self::csr::{CsrGraph, CsrGraphBuilder};

use crate::error::GraphError;

/// Identifier of a node, dense in `[0, node_count)`.
pub type NodeId = usize;

/// Read access to an undirected, optionally weighted graph.
pub trait Graph: Sync {
    /// Number of nodes.
    fn node_count(&self) -> usize;

    /// Number of relationship entries visible from `node`.
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidNodeId`] when `node` is out of range.
    fn degree(&self, node: NodeId) -> Result<usize, GraphError>;

    /// Calls `visitor(source, target, weight)` for every relationship of
    /// `node` until the visitor returns `false`.
    ///
    /// Unweighted graphs report `default_weight` for every relationship.
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidNodeId`] when `node` is out of range.
    fn for_each_relationship<F>(
        &self,
        node: NodeId,
        default_weight: f64,
        visitor: F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(NodeId, NodeId, f64) -> bool;

    /// Total number of relationship entries across all nodes.
    ///
    /// # Errors
    /// Propagates failures from [`Graph::degree`].
    fn relationship_count(&self) -> Result<usize, GraphError> {
        (0..self.node_count()).try_fold(0_usize, |total, node| {
            Ok(total.saturating_add(self.degree(node)?))
        })
    }
}

/// Visits every relationship of `node` with a fallible visitor, stopping at
/// the first error.
pub(crate) fn try_for_each_relationship<G, E, F>(
    graph: &G,
    node: NodeId,
    default_weight: f64,
    mut visitor: F,
) -> Result<(), E>
where
    G: Graph,
    E: From<GraphError>,
    F: FnMut(NodeId, f64) -> Result<(), E>,
{
    let mut failure = None;
    graph.for_each_relationship(node, default_weight, |_, target, weight| {
        match visitor(target, weight) {
            Ok(()) => true,
            Err(error) => {
                failure = Some(error);
                false
            }
        }
    })?;
    failure.map_or(Ok(()), Err)
}
