use commune_core::{AllocationTracker, CsrGraph, Graph, GraphError, NodeId};
use commune_test_support::fixtures::GraphFixture;

/// Adjacency-list [`Graph`] used to exercise the algorithms through a
/// representation other than [`CsrGraph`].
pub struct AdjacencyGraph {
    rows: Vec<Vec<(NodeId, f64)>>,
}

impl AdjacencyGraph {
    #[must_use]
    pub fn from_fixture(fixture: &GraphFixture) -> Self {
        let mut rows = vec![Vec::new(); fixture.node_count];
        for &(source, target, weight) in &fixture.relationships {
            rows[source].push((target, weight));
            rows[target].push((source, weight));
        }
        Self { rows }
    }
}

impl Graph for AdjacencyGraph {
    fn node_count(&self) -> usize {
        self.rows.len()
    }

    fn degree(&self, node: NodeId) -> Result<usize, GraphError> {
        self.rows
            .get(node)
            .map(Vec::len)
            .ok_or(GraphError::InvalidNodeId {
                node,
                node_count: self.rows.len(),
            })
    }

    fn for_each_relationship<F>(
        &self,
        node: NodeId,
        _default_weight: f64,
        mut visitor: F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(NodeId, NodeId, f64) -> bool,
    {
        let row = self.rows.get(node).ok_or(GraphError::InvalidNodeId {
            node,
            node_count: self.rows.len(),
        })?;
        for &(target, weight) in row {
            if !visitor(node, target, weight) {
                break;
            }
        }
        Ok(())
    }
}

#[must_use]
pub fn csr_from(fixture: &GraphFixture, tracker: &AllocationTracker) -> CsrGraph {
    CsrGraph::from_relationships(fixture.node_count, &fixture.relationships, tracker)
        .expect("fixture relationships are valid")
}

/// Returns `true` when both labelings group nodes identically.
#[must_use]
pub fn same_partition(left: &[usize], right: &[usize]) -> bool {
    left.len() == right.len()
        && (0..left.len()).all(|a| {
            (0..left.len()).all(|b| (left[a] == left[b]) == (right[a] == right[b]))
        })
}
