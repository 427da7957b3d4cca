//! Dendrogram returned by [`crate::Louvain::run`].

use crate::{
    Result,
    error::LouvainError,
    graph::NodeId,
    paged::PagedArray,
    tracker::AllocationTracker,
};

/// Whether a run finished or stopped early on request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunStatus {
    /// Every level the configuration allowed was evaluated.
    Completed,
    /// Cancellation stopped the run; only completed levels are kept.
    Cancelled,
}

/// One completed level of the dendrogram.
#[derive(Debug)]
pub struct LouvainLevel {
    communities: PagedArray<usize>,
    modularity: f64,
    community_count: usize,
    iterations: usize,
    converged: bool,
}

impl LouvainLevel {
    pub(super) fn new(
        communities: PagedArray<usize>,
        community_count: usize,
        modularity: f64,
        iterations: usize,
        converged: bool,
    ) -> Self {
        Self {
            communities,
            modularity,
            community_count,
            iterations,
            converged,
        }
    }

    /// Community id of every node of this level's input graph.
    ///
    /// Level 0 is indexed by original node id; level `k + 1` by the community
    /// ids of level `k`. Ids are dense in `[0, community_count)`.
    #[must_use]
    pub const fn communities(&self) -> &PagedArray<usize> {
        &self.communities
    }

    /// Modularity of this level's partition.
    #[must_use]
    pub const fn modularity(&self) -> f64 {
        self.modularity
    }

    /// Number of distinct communities.
    #[must_use]
    pub const fn community_count(&self) -> usize {
        self.community_count
    }

    /// Local-moving passes run on this level.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// `false` when local moving stopped because it ran out of passes.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }
}

/// Community assignments for every completed level.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, CsrGraph, Louvain, LouvainConfig, RunStatus};
///
/// let tracker = AllocationTracker::empty();
/// let graph = CsrGraph::from_unweighted(
///     6,
///     &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)],
///     &tracker,
/// )?;
/// let result = Louvain::new(LouvainConfig::default())?.run(&graph)?;
/// assert_eq!(result.status(), RunStatus::Completed);
/// assert_eq!(result.community_count(0)?, 2);
/// assert_eq!(result.community_of(0, 0)?, result.community_of(2, 0)?);
/// assert_ne!(result.community_of(0, 0)?, result.community_of(3, 0)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct LouvainResult {
    node_count: usize,
    levels: Vec<LouvainLevel>,
    status: RunStatus,
    ran_levels: usize,
}

impl LouvainResult {
    pub(super) fn new(
        node_count: usize,
        levels: Vec<LouvainLevel>,
        status: RunStatus,
        ran_levels: usize,
    ) -> Self {
        Self {
            node_count,
            levels,
            status,
            ran_levels,
        }
    }

    /// Number of nodes in the input graph.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of completed levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Levels evaluated, including one discarded for insufficient gain.
    #[must_use]
    pub const fn ran_levels(&self) -> usize {
        self.ran_levels
    }

    /// How the run ended.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns `true` when cancellation cut the run short.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    /// Every completed level, outermost last.
    #[must_use]
    pub fn levels(&self) -> &[LouvainLevel] {
        &self.levels
    }

    /// The completed level `level`.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] when `level` was not
    /// completed.
    pub fn level(&self, level: usize) -> Result<&LouvainLevel> {
        self.levels.get(level).ok_or(LouvainError::LevelOutOfRange {
            level,
            level_count: self.levels.len(),
        })
    }

    /// Modularity recorded for `level`.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] when `level` was not
    /// completed.
    pub fn modularity_of(&self, level: usize) -> Result<f64> {
        Ok(self.level(level)?.modularity())
    }

    /// Number of communities at `level`.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] when `level` was not
    /// completed.
    pub fn community_count(&self, level: usize) -> Result<usize> {
        Ok(self.level(level)?.community_count())
    }

    /// Modularity of the last completed level, `0.0` when none completed.
    #[must_use]
    pub fn final_modularity(&self) -> f64 {
        self.levels.last().map_or(0.0, LouvainLevel::modularity)
    }

    /// Community of original node `node` at `level`, composing the per-level
    /// mappings.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] for an unknown level and
    /// [`LouvainError::Storage`] for an unknown node.
    pub fn community_of(&self, node: NodeId, level: usize) -> Result<usize> {
        self.level(level)?;
        let mut community = node;
        for step in self.levels.iter().take(level + 1) {
            community = step.communities.get(community)?;
        }
        Ok(community)
    }

    /// Community of original node `node` at every completed level.
    ///
    /// # Errors
    /// Returns [`LouvainError::Storage`] for an unknown node.
    pub fn intermediate_communities(&self, node: NodeId) -> Result<Vec<usize>> {
        let mut community = node;
        self.levels
            .iter()
            .map(|step| -> Result<usize> {
                community = step.communities.get(community)?;
                Ok(community)
            })
            .collect()
    }

    /// Community of every original node at `level`.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] for an unknown level and
    /// [`LouvainError::Storage`] when the output cannot be allocated.
    pub fn flatten(&self, level: usize, tracker: &AllocationTracker) -> Result<PagedArray<usize>> {
        self.level(level)?;
        let mut flattened = PagedArray::new(self.node_count, tracker)?;
        flattened.try_set_all(|node| self.community_of(node, level))?;
        Ok(flattened)
    }

    /// Community of every original node at the last completed level.
    ///
    /// # Errors
    /// Returns [`LouvainError::LevelOutOfRange`] when no level completed.
    pub fn final_communities(&self, tracker: &AllocationTracker) -> Result<PagedArray<usize>> {
        self.flatten(self.levels.len().saturating_sub(1), tracker)
    }
}
