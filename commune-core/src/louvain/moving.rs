//! Local moving: reassign nodes to the neighbouring community with the best
//! modularity gain until a pass stops paying off.

use std::{collections::HashMap, sync::atomic::AtomicUsize};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::trace;

use crate::{
    Result,
    cancel::CancellationToken,
    error::LouvainError,
    graph::{Graph, NodeId, try_for_each_relationship},
    paged::{AtomicF64, PagedArray, PagedAtomicArray},
    tracker::AllocationTracker,
};

use super::{
    DEFAULT_WEIGHT,
    config::{LocalMoving, LouvainConfig, NodeOrder},
    modularity::modularity_at,
};

/// Partition reached by local moving on one level.
pub(super) struct MovingOutcome {
    pub(super) communities: PagedAtomicArray<AtomicUsize>,
    pub(super) modularity: f64,
    pub(super) iterations: usize,
    pub(super) converged: bool,
}

/// Per-level state shared by every worker during a pass.
struct MovingState<'g, G> {
    graph: &'g G,
    volumes: PagedArray<f64>,
    communities: PagedAtomicArray<AtomicUsize>,
    community_totals: PagedAtomicArray<AtomicF64>,
    // `resolution / 2m`, applied to every null-model term
    scaled_resolution: f64,
}

/// Runs local moving on `graph`.
///
/// Returns `Ok(None)` when `cancellation` fires between passes.
pub(super) fn optimise<G: Graph>(
    graph: &G,
    level: usize,
    config: &LouvainConfig,
    cancellation: &CancellationToken,
) -> Result<Option<MovingOutcome>> {
    let tracker = &config.tracker;
    let node_count = graph.node_count();
    let mut volumes = PagedArray::<f64>::new(node_count, tracker)?;
    let mut entries = 0_usize;
    volumes.try_set_all(|node| {
        let mut volume = 0.0;
        try_for_each_relationship(graph, node, DEFAULT_WEIGHT, |_, weight| {
            entries += 1;
            volume += weight;
            Ok::<_, LouvainError>(())
        })?;
        Ok::<_, LouvainError>(volume)
    })?;
    let total_weight: f64 = volumes.iter()?.sum();

    let communities = PagedAtomicArray::<AtomicUsize>::new(node_count, tracker)?;
    communities.par_set_all(|node| node)?;
    if entries == 0 {
        return Ok(Some(MovingOutcome {
            communities,
            modularity: 0.0,
            iterations: 0,
            converged: true,
        }));
    }
    if !total_weight.is_finite() || total_weight == 0.0 {
        return Err(LouvainError::NonFiniteModularity { level });
    }

    let community_totals = PagedAtomicArray::<AtomicF64>::new(node_count, tracker)?;
    for node in 0..node_count {
        community_totals.set(node, volumes.get(node)?)?;
    }
    let state = MovingState {
        graph,
        volumes,
        communities,
        community_totals,
        scaled_resolution: config.resolution / total_weight,
    };
    let order = visiting_order(node_count, level, config, tracker)?;

    let mut modularity = state.modularity(config.resolution, level, tracker)?;
    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iterations {
        if cancellation.is_cancelled() {
            return Ok(None);
        }
        let moves = match config.local_moving {
            LocalMoving::Sequential => state.sweep(&order, 0..node_count)?,
            LocalMoving::Asynchronous => state.parallel_sweep(&order, config.concurrency)?,
        };
        iterations += 1;
        let updated = state.modularity(config.resolution, level, tracker)?;
        let gain = updated - modularity;
        modularity = updated;
        trace!(level, pass = iterations, moves, modularity, "local moving pass finished");
        if moves == 0 || gain < config.min_modularity_gain {
            converged = true;
            break;
        }
    }

    Ok(Some(MovingOutcome {
        communities: state.communities,
        modularity,
        iterations,
        converged,
    }))
}

fn visiting_order(
    node_count: usize,
    level: usize,
    config: &LouvainConfig,
    tracker: &AllocationTracker,
) -> Result<PagedArray<NodeId>> {
    let mut order = PagedArray::new(node_count, tracker)?;
    order.par_set_all(|node| node)?;
    if config.node_order == NodeOrder::Shuffled {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(level as u64)),
            None => SmallRng::from_entropy(),
        };
        shuffle(&mut order, &mut rng)?;
    }
    Ok(order)
}

/// Fisher-Yates over paged storage.
fn shuffle(order: &mut PagedArray<NodeId>, rng: &mut SmallRng) -> Result<()> {
    for index in (1..order.len()).rev() {
        let other = rng.gen_range(0..=index);
        let current = order.get(index)?;
        order.set(index, order.get(other)?)?;
        order.set(other, current)?;
    }
    Ok(())
}

impl<G: Graph> MovingState<'_, G> {
    fn modularity(
        &self,
        resolution: f64,
        level: usize,
        tracker: &AllocationTracker,
    ) -> Result<f64> {
        modularity_at(
            self.graph,
            |node| self.communities.get(node),
            resolution,
            level,
            tracker,
        )
    }

    /// Visits `order[range]` once, returning the number of moved nodes.
    fn sweep(&self, order: &PagedArray<NodeId>, range: std::ops::Range<usize>) -> Result<usize> {
        let mut scratch = HashMap::new();
        let mut moves = 0;
        for position in range {
            if self.move_node(order.get(position)?, &mut scratch)? {
                moves += 1;
            }
        }
        Ok(moves)
    }

    fn parallel_sweep(&self, order: &PagedArray<NodeId>, concurrency: usize) -> Result<usize> {
        let node_count = order.len();
        let batch = node_count.div_ceil(concurrency).max(1);
        (0..node_count)
            .step_by(batch)
            .collect::<Vec<usize>>()
            .into_par_iter()
            .map(|start| self.sweep(order, start..(start + batch).min(node_count)))
            .try_reduce(|| 0, |left, right| Ok(left + right))
    }

    /// Moves `node` to the neighbouring community with the highest gain when
    /// that beats staying put. Ties between candidates go to the lowest id.
    fn move_node(&self, node: NodeId, scratch: &mut HashMap<usize, f64>) -> Result<bool> {
        scratch.clear();
        try_for_each_relationship(self.graph, node, DEFAULT_WEIGHT, |target, weight| {
            if target != node {
                *scratch.entry(self.communities.get(target)?).or_insert(0.0) += weight;
            }
            Ok::<_, LouvainError>(())
        })?;

        let current = self.communities.get(node)?;
        let volume = self.volumes.get(node)?;
        let penalty = self.scaled_resolution * volume;
        let remaining = self.community_totals.get(current)? - volume;
        let stay = scratch.get(&current).copied().unwrap_or(0.0) - penalty * remaining;

        let mut best = current;
        let mut best_score = stay;
        for (&candidate, &weight) in scratch.iter() {
            if candidate == current {
                continue;
            }
            let score = weight - penalty * self.community_totals.get(candidate)?;
            if score > best_score || (score == best_score && best != current && candidate < best) {
                best = candidate;
                best_score = score;
            }
        }
        if best == current {
            return Ok(false);
        }

        self.community_totals
            .update(current, |total| total - volume)?;
        self.community_totals.update(best, |total| total + volume)?;
        self.communities.set(node, best)?;
        Ok(true)
    }
}
