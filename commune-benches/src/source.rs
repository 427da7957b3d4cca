//! Synthetic community-structured graphs for benchmarking.
//!
//! Nodes are split into contiguous blocks of near-equal size. Every node
//! draws `ceil(average_degree / 2)` relationships; each lands inside the
//! node's own block unless a `mixing` coin flip sends it to a uniformly
//! chosen node anywhere in the graph.

use commune_core::{AllocationTracker, CsrGraph, GraphError, NodeId};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors raised while validating a [`SyntheticGraphConfig`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SyntheticError {
    /// The requested node count was zero.
    #[error("node count must be greater than zero")]
    ZeroNodes,
    /// The requested community count was zero.
    #[error("community count must be greater than zero")]
    ZeroCommunities,
    /// More communities than nodes were requested.
    #[error("community count ({community_count}) must not exceed node count ({node_count})")]
    CommunityCountExceedsNodeCount {
        /// Number of communities requested.
        community_count: usize,
        /// Number of nodes requested.
        node_count: usize,
    },
    /// The requested average degree was zero.
    #[error("average degree must be greater than zero")]
    ZeroDegree,
    /// The mixing probability was outside `[0, 1]`.
    #[error("mixing must lie in [0, 1], got {mixing}")]
    InvalidMixing {
        /// Rejected probability.
        mixing: f64,
    },
}

/// Shape of a generated graph.
#[derive(Clone, Debug)]
pub struct SyntheticGraphConfig {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of planted communities.
    pub community_count: usize,
    /// Expected number of relationships per node.
    pub average_degree: usize,
    /// Probability that a relationship ignores community boundaries.
    pub mixing: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

impl SyntheticGraphConfig {
    fn validate(&self) -> Result<(), SyntheticError> {
        if self.node_count == 0 {
            return Err(SyntheticError::ZeroNodes);
        }
        if self.community_count == 0 {
            return Err(SyntheticError::ZeroCommunities);
        }
        if self.community_count > self.node_count {
            return Err(SyntheticError::CommunityCountExceedsNodeCount {
                community_count: self.community_count,
                node_count: self.node_count,
            });
        }
        if self.average_degree == 0 {
            return Err(SyntheticError::ZeroDegree);
        }
        if !(0.0..=1.0).contains(&self.mixing) {
            return Err(SyntheticError::InvalidMixing {
                mixing: self.mixing,
            });
        }
        Ok(())
    }
}

/// Unit-weight relationships of a generated graph.
#[derive(Clone, Debug)]
pub struct SyntheticGraph {
    node_count: usize,
    community_size: usize,
    relationships: Vec<(NodeId, NodeId, f64)>,
}

impl SyntheticGraph {
    /// Generates a graph shaped by `config`.
    ///
    /// Self-loops drawn by chance are discarded, so the relationship count
    /// may fall slightly short of `node_count * ceil(average_degree / 2)`.
    ///
    /// # Errors
    /// Returns [`SyntheticError`] when `config` is invalid.
    pub fn generate(config: &SyntheticGraphConfig) -> Result<Self, SyntheticError> {
        config.validate()?;
        let node_count = config.node_count;
        let community_size = node_count.div_ceil(config.community_count);
        let draws = config.average_degree.div_ceil(2);
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut relationships = Vec::with_capacity(node_count.saturating_mul(draws));

        for start in (0..node_count).step_by(community_size) {
            let end = start.saturating_add(community_size).min(node_count);
            for node in start..end {
                for _ in 0..draws {
                    let target = if rng.gen_bool(config.mixing) {
                        rng.gen_range(0..node_count)
                    } else {
                        rng.gen_range(start..end)
                    };
                    if target != node {
                        relationships.push((node, target, 1.0));
                    }
                }
            }
        }

        Ok(Self {
            node_count,
            community_size,
            relationships,
        })
    }

    /// Number of nodes.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Nodes per planted community; the last block may be smaller.
    #[must_use]
    pub const fn community_size(&self) -> usize {
        self.community_size
    }

    /// Generated `(source, target, weight)` triples.
    #[must_use]
    pub fn relationships(&self) -> &[(NodeId, NodeId, f64)] {
        &self.relationships
    }

    /// Builds a CSR graph charged to `tracker`.
    ///
    /// # Errors
    /// Returns [`GraphError`] when construction fails.
    pub fn to_csr(&self, tracker: &AllocationTracker) -> Result<CsrGraph, GraphError> {
        CsrGraph::from_relationships(self.node_count, &self.relationships, tracker)
    }
}
