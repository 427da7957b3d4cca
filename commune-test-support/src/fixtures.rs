//! Graph fixtures with known community structure.
//!
//! Fixtures are plain relationship lists so every crate in the workspace can
//! turn them into whatever graph representation it tests.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Relationship list plus the communities it was generated from.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphFixture {
    /// Number of nodes; ids lie in `[0, node_count)`.
    pub node_count: usize,
    /// Undirected `(source, target, weight)` relationships.
    pub relationships: Vec<(usize, usize, f64)>,
    /// Planted community of every node.
    pub communities: Vec<usize>,
}

impl GraphFixture {
    /// Relationships without their weights.
    #[must_use]
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.relationships
            .iter()
            .map(|&(source, target, _)| (source, target))
            .collect()
    }

    /// Number of distinct planted communities.
    #[must_use]
    pub fn community_count(&self) -> usize {
        self.communities.iter().max().map_or(0, |&max| max + 1)
    }
}

/// Two disjoint triangles, `{0, 1, 2}` and `{3, 4, 5}`.
///
/// # Examples
/// ```
/// use commune_test_support::fixtures::two_triangles;
///
/// let fixture = two_triangles();
/// assert_eq!(fixture.node_count, 6);
/// assert_eq!(fixture.community_count(), 2);
/// ```
#[must_use]
pub fn two_triangles() -> GraphFixture {
    let relationships = [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]
        .into_iter()
        .map(|(source, target)| (source, target, 1.0))
        .collect();
    GraphFixture {
        node_count: 6,
        relationships,
        communities: vec![0, 0, 0, 1, 1, 1],
    }
}

/// `count` cliques of `size` nodes, each joined to the next by a single
/// relationship so the cliques form a ring.
#[must_use]
pub fn ring_of_cliques(count: usize, size: usize) -> GraphFixture {
    let mut relationships = Vec::new();
    for clique in 0..count {
        let base = clique * size;
        for left in 0..size {
            for right in (left + 1)..size {
                relationships.push((base + left, base + right, 1.0));
            }
        }
        if count > 1 && size > 1 {
            relationships.push((base, ((clique + 1) % count) * size + 1, 1.0));
        }
    }
    GraphFixture {
        node_count: count * size,
        relationships,
        communities: (0..count * size).map(|node| node / size.max(1)).collect(),
    }
}

/// Parameters of a planted-partition random graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlantedPartition {
    /// Number of planted communities.
    pub communities: usize,
    /// Nodes per community.
    pub community_size: usize,
    /// Probability of a relationship between two members of one community.
    pub intra_probability: f64,
    /// Probability of a relationship between members of different
    /// communities.
    pub inter_probability: f64,
    /// Seed for the generator.
    pub seed: u64,
}

impl PlantedPartition {
    /// Samples every node pair once.
    ///
    /// # Examples
    /// ```
    /// use commune_test_support::fixtures::PlantedPartition;
    ///
    /// let params = PlantedPartition {
    ///     communities: 3,
    ///     community_size: 8,
    ///     intra_probability: 1.0,
    ///     inter_probability: 0.0,
    ///     seed: 7,
    /// };
    /// let fixture = params.generate();
    /// assert_eq!(fixture.relationships.len(), 3 * 28);
    /// assert_eq!(fixture, params.generate());
    /// ```
    #[must_use]
    pub fn generate(&self) -> GraphFixture {
        let node_count = self.communities * self.community_size;
        let communities: Vec<usize> = (0..node_count)
            .map(|node| node / self.community_size.max(1))
            .collect();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut relationships = Vec::new();
        for source in 0..node_count {
            for target in (source + 1)..node_count {
                let probability = if communities[source] == communities[target] {
                    self.intra_probability
                } else {
                    self.inter_probability
                };
                if rng.gen_bool(probability.clamp(0.0, 1.0)) {
                    relationships.push((source, target, 1.0));
                }
            }
        }
        GraphFixture {
            node_count,
            relationships,
            communities,
        }
    }
}
