//! Multi-level modularity optimisation (Louvain).
//!
//! Each level runs local moving on the current graph, records the partition,
//! and collapses every community into one node of the next level's graph.
//! Levels stop once the graph collapses to a single community, a level merges
//! nothing, the next level fails to improve modularity by
//! `min_modularity_gain`, or `max_levels` levels are kept.

mod aggregate;
mod config;
mod modularity;
mod moving;
mod result;

pub use self::config::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_LEVELS, DEFAULT_MIN_MODULARITY_GAIN, DEFAULT_RESOLUTION,
    LocalMoving, LouvainBuilder, LouvainConfig, NodeOrder,
};
pub use self::modularity::modularity;
pub use self::result::{LouvainLevel, LouvainResult, RunStatus};

use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    cancel::CancellationToken,
    dss::relabel,
    error::LouvainError,
    graph::{CsrGraph, Graph},
};

/// Weight reported for relationships of unweighted graphs.
pub(crate) const DEFAULT_WEIGHT: f64 = 1.0;

/// Louvain community detection engine.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, CsrGraph, LouvainBuilder};
///
/// let tracker = AllocationTracker::new();
/// let graph = CsrGraph::from_unweighted(1, &[], &tracker)?;
/// let louvain = LouvainBuilder::new().with_tracker(tracker.clone()).build()?;
/// let result = louvain.run(&graph)?;
/// assert_eq!(result.level_count(), 1);
/// assert_eq!(result.community_count(0)?, 1);
/// assert_eq!(result.modularity_of(0)?, 0.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Louvain {
    config: LouvainConfig,
}

impl Louvain {
    /// Validates `config` and constructs an engine.
    ///
    /// # Errors
    /// See [`LouvainConfig::validate`].
    pub fn new(config: LouvainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Starts a [`LouvainBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> LouvainBuilder {
        LouvainBuilder::new()
    }

    /// Settings used by every run.
    #[must_use]
    pub const fn config(&self) -> &LouvainConfig {
        &self.config
    }

    /// Detects communities in `graph`.
    ///
    /// # Errors
    /// Returns [`LouvainError::EmptyGraph`] for a graph without nodes when
    /// `require_nodes` is set, [`LouvainError::NonFiniteModularity`] when the
    /// relationship weights do not sum to a finite non-zero total, and
    /// [`LouvainError::Graph`] or [`LouvainError::Storage`] when traversal or
    /// allocation fails.
    pub fn run<G: Graph>(&self, graph: &G) -> Result<LouvainResult> {
        self.run_with_cancellation(graph, &CancellationToken::new())
    }

    /// Detects communities in `graph`, polling `cancellation` between passes
    /// and levels.
    ///
    /// A cancelled run is not an error: it returns the completed levels with
    /// [`RunStatus::Cancelled`].
    ///
    /// # Errors
    /// See [`Louvain::run`].
    pub fn run_with_cancellation<G: Graph>(
        &self,
        graph: &G,
        cancellation: &CancellationToken,
    ) -> Result<LouvainResult> {
        let node_count = graph.node_count();
        let relationship_count = graph.relationship_count()?;
        self.run_counted(graph, node_count, relationship_count, cancellation)
    }

    #[instrument(
        name = "core.louvain.run",
        err,
        skip(self, graph, cancellation),
        fields(
            node_count = node_count,
            relationship_count = relationship_count,
            max_levels = self.config.max_levels,
            resolution = self.config.resolution,
            local_moving = ?self.config.local_moving,
            node_order = ?self.config.node_order,
        ),
    )]
    fn run_counted<G: Graph>(
        &self,
        graph: &G,
        node_count: usize,
        relationship_count: usize,
        cancellation: &CancellationToken,
    ) -> Result<LouvainResult> {
        if node_count == 0 {
            if self.config.require_nodes {
                return Err(LouvainError::EmptyGraph);
            }
            info!("graph has no nodes, returning a vacuous result");
            return self.vacuous_result();
        }

        let mut levels: Vec<LouvainLevel> = Vec::new();
        let mut aggregated: Option<CsrGraph> = None;
        let mut ran_levels = 0;
        let mut status = RunStatus::Completed;
        loop {
            let level = ran_levels;
            if cancellation.is_cancelled() {
                status = RunStatus::Cancelled;
                break;
            }
            let outcome = match &aggregated {
                None => self.run_level(graph, level, cancellation)?,
                Some(current) => self.run_level(current, level, cancellation)?,
            };
            let Some(candidate) = outcome else {
                status = RunStatus::Cancelled;
                break;
            };
            ran_levels += 1;

            if let Some(previous) = levels.last()
                && candidate.modularity() - previous.modularity() < self.config.min_modularity_gain
            {
                debug!(
                    level,
                    modularity = candidate.modularity(),
                    previous = previous.modularity(),
                    "level did not improve modularity, stopping"
                );
                break;
            }

            let input_size = candidate.communities().len();
            debug!(
                level,
                communities = candidate.community_count(),
                modularity = candidate.modularity(),
                iterations = candidate.iterations(),
                converged = candidate.converged(),
                "level completed"
            );
            let exhausted = candidate.community_count() <= 1
                || candidate.community_count() == input_size
                || levels.len() + 1 == self.config.max_levels;
            if !exhausted {
                let next = match &aggregated {
                    None => self.collapse(graph, &candidate)?,
                    Some(current) => self.collapse(current, &candidate)?,
                };
                aggregated = Some(next);
            }
            levels.push(candidate);
            if exhausted {
                break;
            }
        }

        if status == RunStatus::Cancelled {
            warn!(
                completed_levels = levels.len(),
                "louvain run cancelled, returning completed levels"
            );
        }
        Ok(LouvainResult::new(node_count, levels, status, ran_levels))
    }

    fn vacuous_result(&self) -> Result<LouvainResult> {
        let communities = crate::paged::PagedArray::new(0, &self.config.tracker)?;
        let level = LouvainLevel::new(communities, 0, 0.0, 0, true);
        Ok(LouvainResult::new(0, vec![level], RunStatus::Completed, 1))
    }

    /// Runs local moving on one level and relabels its communities densely.
    fn run_level<G: Graph>(
        &self,
        graph: &G,
        level: usize,
        cancellation: &CancellationToken,
    ) -> Result<Option<LouvainLevel>> {
        let Some(outcome) = moving::optimise(graph, level, &self.config, cancellation)? else {
            return Ok(None);
        };
        let dense = relabel(graph.node_count(), &self.config.tracker, |node| {
            outcome.communities.get(node)
        })?;
        let community_count = dense.component_count();
        Ok(Some(LouvainLevel::new(
            dense.into_ids(),
            community_count,
            outcome.modularity,
            outcome.iterations,
            outcome.converged,
        )))
    }

    fn collapse<G: Graph>(&self, graph: &G, level: &LouvainLevel) -> Result<CsrGraph> {
        aggregate::aggregate(
            graph,
            level.communities(),
            level.community_count(),
            &self.config.tracker,
        )
    }
}
