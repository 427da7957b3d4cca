//! Collapses each community into a single node of the next level's graph.
//!
//! Relationships between communities carry the summed weight of the
//! relationships between their members. The weight of every relationship
//! inside a community becomes a self-loop on its node, stored as two entries
//! of half the weight so the node's volume equals the community's volume.

use std::collections::HashMap;

use crate::{
    Result,
    error::LouvainError,
    graph::{CsrGraph, Graph, NodeId, try_for_each_relationship},
    paged::PagedArray,
    tracker::AllocationTracker,
};

use super::DEFAULT_WEIGHT;

/// Members of every community, grouped by a counting sort.
struct Membership {
    offsets: PagedArray<usize>,
    members: PagedArray<NodeId>,
}

impl Membership {
    fn group(
        communities: &PagedArray<usize>,
        community_count: usize,
        tracker: &AllocationTracker,
    ) -> Result<Self> {
        let mut offsets = PagedArray::<usize>::new(community_count + 1, tracker)?;
        for community in communities.iter()? {
            offsets.add_to(community + 1, 1)?;
        }
        for index in 1..=community_count {
            let previous = offsets.get(index - 1)?;
            offsets.add_to(index, previous)?;
        }

        let mut cursor = PagedArray::<usize>::new(community_count, tracker)?;
        cursor.try_set_all(|community| offsets.get(community))?;
        let mut members = PagedArray::<NodeId>::new(communities.len(), tracker)?;
        for (node, community) in communities.iter()?.enumerate() {
            let slot = cursor.get(community)?;
            cursor.set(community, slot + 1)?;
            members.set(slot, node)?;
        }
        Ok(Self { offsets, members })
    }

    /// Sums, per neighbouring community, the weights leaving `community`'s
    /// members. Entries that stay inside land under `community` itself.
    fn collect_row<G: Graph>(
        &self,
        graph: &G,
        communities: &PagedArray<usize>,
        community: usize,
        row: &mut HashMap<usize, f64>,
    ) -> Result<()> {
        row.clear();
        for position in self.offsets.get(community)?..self.offsets.get(community + 1)? {
            let member = self.members.get(position)?;
            try_for_each_relationship(graph, member, DEFAULT_WEIGHT, |target, weight| {
                *row.entry(communities.get(target)?).or_insert(0.0) += weight;
                Ok::<_, LouvainError>(())
            })?;
        }
        Ok(())
    }
}

/// Builds the graph whose node `c` stands for community `c`.
///
/// `communities` must hold dense ids in `[0, community_count)`.
pub(super) fn aggregate<G: Graph>(
    graph: &G,
    communities: &PagedArray<usize>,
    community_count: usize,
    tracker: &AllocationTracker,
) -> Result<CsrGraph> {
    let membership = Membership::group(communities, community_count, tracker)?;
    let mut row = HashMap::new();

    let mut offsets = PagedArray::<usize>::new(community_count + 1, tracker)?;
    for community in 0..community_count {
        membership.collect_row(graph, communities, community, &mut row)?;
        let length = row.len() + usize::from(row.contains_key(&community));
        let start = offsets.get(community)?;
        offsets.set(community + 1, start + length)?;
    }

    let entry_count = offsets.get(community_count)?;
    let mut targets = PagedArray::<NodeId>::new(entry_count, tracker)?;
    let mut weights = PagedArray::<f64>::new(entry_count, tracker)?;
    let mut sorted = Vec::new();
    for community in 0..community_count {
        membership.collect_row(graph, communities, community, &mut row)?;
        sorted.clear();
        sorted.extend(row.iter().map(|(&target, &weight)| (target, weight)));
        sorted.sort_unstable_by_key(|&(target, _)| target);

        let mut slot = offsets.get(community)?;
        for &(target, weight) in &sorted {
            let (copies, entry) = if target == community {
                (2, weight / 2.0)
            } else {
                (1, weight)
            };
            for _ in 0..copies {
                targets.set(slot, target)?;
                weights.set(slot, entry)?;
                slot += 1;
            }
        }
    }
    Ok(CsrGraph::from_parts(offsets, targets, Some(weights)))
}
