//! Exact modularity of a partition.
//!
//! With `2m` the sum of all visited relationship weights, `in_c` the weight
//! of entries whose endpoints both sit in community `c`, and `tot_c` the summed
//! volume of `c`'s members:
//!
//! `Q = Σ_c in_c / 2m − γ · (tot_c / 2m)²`

use crate::{
    Result,
    error::{LouvainError, PagedArrayError},
    graph::{Graph, NodeId, try_for_each_relationship},
    paged::PagedArray,
    tracker::AllocationTracker,
};

use super::DEFAULT_WEIGHT;

/// Evaluates the modularity of `communities` on `graph`.
///
/// Community ids must lie in `[0, node_count)`. A graph without relationships
/// has modularity `0.0`.
///
/// # Errors
/// Returns [`LouvainError::InvalidResolution`] for a resolution that is not
/// finite and positive, [`LouvainError::Storage`] when `communities` is
/// shorter than the graph or holds an id outside the node range, and
/// [`LouvainError::NonFiniteModularity`] when the weights sum to zero or to a
/// non-finite value.
///
/// # Examples
/// ```
/// use commune_core::{AllocationTracker, CsrGraph, PagedArray, modularity};
///
/// let tracker = AllocationTracker::empty();
/// let graph = CsrGraph::from_unweighted(4, &[(0, 1), (2, 3)], &tracker)?;
/// let mut communities = PagedArray::<usize>::new(4, &tracker)?;
/// communities.set_all(|node| node / 2)?;
/// let score = modularity(&graph, &communities, 1.0, &tracker)?;
/// assert!((score - 0.5).abs() < 1e-12);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn modularity<G: Graph>(
    graph: &G,
    communities: &PagedArray<usize>,
    resolution: f64,
    tracker: &AllocationTracker,
) -> Result<f64> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(LouvainError::InvalidResolution { got: resolution });
    }
    modularity_at(graph, |node| communities.get(node), resolution, 0, tracker)
}

/// Modularity of the partition produced by `community_of`, reporting
/// non-finite results against `level`.
pub(crate) fn modularity_at<G, C>(
    graph: &G,
    community_of: C,
    resolution: f64,
    level: usize,
    tracker: &AllocationTracker,
) -> Result<f64>
where
    G: Graph,
    C: Fn(NodeId) -> core::result::Result<usize, PagedArrayError>,
{
    let node_count = graph.node_count();
    let mut internal = PagedArray::<f64>::new(node_count, tracker)?;
    let mut totals = PagedArray::<f64>::new(node_count, tracker)?;
    let mut total_weight = 0.0;
    let mut entries = 0_usize;
    for node in 0..node_count {
        let community = community_of(node)?;
        let mut volume = 0.0;
        let mut inside = 0.0;
        try_for_each_relationship(graph, node, DEFAULT_WEIGHT, |target, weight| {
            entries += 1;
            volume += weight;
            if community_of(target)? == community {
                inside += weight;
            }
            Ok::<_, LouvainError>(())
        })?;
        totals.add_to(community, volume)?;
        internal.add_to(community, inside)?;
        total_weight += volume;
    }
    if entries == 0 {
        return Ok(0.0);
    }
    if !total_weight.is_finite() || total_weight == 0.0 {
        return Err(LouvainError::NonFiniteModularity { level });
    }
    let score = internal
        .iter()?
        .zip(totals.iter()?)
        .map(|(inside, total)| {
            let share = total / total_weight;
            inside / total_weight - resolution * share * share
        })
        .sum::<f64>();
    if score.is_finite() {
        Ok(score)
    } else {
        Err(LouvainError::NonFiniteModularity { level })
    }
}
