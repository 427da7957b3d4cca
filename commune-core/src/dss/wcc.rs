//! Weakly connected components over a [`Graph`].

use std::num::NonZeroUsize;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::WccError,
    graph::{Graph, NodeId, try_for_each_relationship},
    tracker::AllocationTracker,
};

use super::{ComponentAssignment, ConcurrentDisjointSetStruct, DisjointSetStruct, UnionStrategy};

/// Weight reported for relationships of unweighted graphs.
const DEFAULT_WEIGHT: f64 = 1.0;

/// Settings for [`weakly_connected_components`].
#[derive(Clone, Debug, PartialEq)]
pub struct WccConfig {
    /// When set, only relationships whose weight is strictly greater join
    /// their endpoints.
    pub threshold: Option<f64>,
    /// Number of workers. `1` selects the sequential disjoint set.
    pub concurrency: usize,
}

impl Default for WccConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            concurrency: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

impl WccConfig {
    /// Checks the configuration for values the algorithm cannot honour.
    ///
    /// # Errors
    /// Returns [`WccError::InvalidThreshold`] for a NaN or infinite threshold
    /// and [`WccError::InvalidConcurrency`] for zero workers.
    pub fn validate(&self) -> Result<(), WccError> {
        if let Some(threshold) = self.threshold
            && !threshold.is_finite()
        {
            return Err(WccError::InvalidThreshold { got: threshold });
        }
        if self.concurrency == 0 {
            return Err(WccError::InvalidConcurrency {
                got: self.concurrency,
            });
        }
        Ok(())
    }

    fn admits(&self, weight: f64) -> bool {
        self.threshold.is_none_or(|threshold| weight > threshold)
    }
}

/// Labels every node with the id of its weakly connected component.
///
/// Component ids are dense and numbered in order of each component's smallest
/// node, so the result does not depend on `concurrency`.
///
/// # Errors
/// Returns [`WccError`] when the configuration is invalid, the graph cannot be
/// traversed, or storage cannot be allocated.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, CsrGraph, WccConfig, weakly_connected_components};
///
/// let tracker = AllocationTracker::empty();
/// let graph = CsrGraph::from_relationships(4, &[(0, 1, 0.9), (2, 3, 0.1)], &tracker)?;
/// let config = WccConfig { threshold: Some(0.5), concurrency: 1 };
/// let components = weakly_connected_components(&graph, &config, &tracker)?;
/// assert_eq!(components.component_count(), 3);
/// assert_eq!(components.component_of(1)?, 0);
/// assert_eq!(components.component_of(3)?, 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[instrument(
    name = "core.wcc.run",
    err,
    skip(graph, config, tracker),
    fields(
        node_count = graph.node_count(),
        concurrency = config.concurrency,
        threshold = ?config.threshold,
    ),
)]
pub fn weakly_connected_components<G: Graph>(
    graph: &G,
    config: &WccConfig,
    tracker: &AllocationTracker,
) -> Result<ComponentAssignment, WccError> {
    config.validate()?;
    let node_count = graph.node_count();
    let components = if config.concurrency == 1 || node_count < 2 {
        sequential(graph, config, tracker)?
    } else {
        parallel(graph, config, tracker)?
    };
    debug!(
        components = components.component_count(),
        "weakly connected components resolved"
    );
    Ok(components)
}

fn sequential<G: Graph>(
    graph: &G,
    config: &WccConfig,
    tracker: &AllocationTracker,
) -> Result<ComponentAssignment, WccError> {
    let mut sets = DisjointSetStruct::new(graph.node_count(), UnionStrategy::BySize, tracker)?;
    for node in 0..graph.node_count() {
        try_for_each_relationship(graph, node, DEFAULT_WEIGHT, |target, weight| {
            if config.admits(weight) {
                sets.union(node, target)?;
            }
            Ok::<_, WccError>(())
        })?;
    }
    Ok(sets.into_components(tracker)?)
}

fn parallel<G: Graph>(
    graph: &G,
    config: &WccConfig,
    tracker: &AllocationTracker,
) -> Result<ComponentAssignment, WccError> {
    let node_count = graph.node_count();
    let sets = ConcurrentDisjointSetStruct::new(node_count, tracker)?;
    let batch = node_count.div_ceil(config.concurrency).max(1);
    (0..node_count)
        .step_by(batch)
        .collect::<Vec<NodeId>>()
        .into_par_iter()
        .try_for_each(|start| {
            for node in start..(start + batch).min(node_count) {
                try_for_each_relationship(graph, node, DEFAULT_WEIGHT, |target, weight| {
                    if config.admits(weight) {
                        sets.union(node, target)?;
                    }
                    Ok::<_, WccError>(())
                })?;
            }
            Ok::<_, WccError>(())
        })?;
    Ok(sets.into_components(tracker)?)
}
