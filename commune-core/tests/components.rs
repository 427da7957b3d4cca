//! Tests for union-find and weakly connected components.

mod common;

use commune_core::{
    AllocationTracker, ConcurrentDisjointSetStruct, DisjointSetStruct, UnionStrategy, WccConfig,
    WccError, WccErrorCode, weakly_connected_components,
};
use commune_test_support::{
    fixtures::{PlantedPartition, ring_of_cliques},
    tracing::RecordingLayer,
};
use common::{AdjacencyGraph, csr_from, same_partition};
use rayon::prelude::*;
use rstest::rstest;

#[rstest]
#[case::by_size(UnionStrategy::BySize)]
#[case::by_rank(UnionStrategy::ByRank)]
#[case::unweighted(UnionStrategy::Unweighted)]
fn five_nodes_split_into_two_sets(#[case] strategy: UnionStrategy) {
    let tracker = AllocationTracker::empty();
    let mut sets = DisjointSetStruct::new(5, strategy, &tracker).expect("allocation");
    for (left, right) in [(0, 1), (2, 3), (1, 2)] {
        sets.union(left, right).expect("nodes in range");
    }

    assert_eq!(sets.set_count(), 2);
    let components = sets.into_components(&tracker).expect("relabel");
    assert_eq!(components.ids().to_vec(), Ok(vec![0, 0, 0, 0, 1]));
}

#[rstest]
fn concurrent_unions_converge() {
    let tracker = AllocationTracker::empty();
    let sets = ConcurrentDisjointSetStruct::new(1_000, &tracker).expect("allocation");
    (0..999_usize).into_par_iter().for_each(|node| {
        sets.union(node, node + 1).expect("nodes in range");
    });

    assert_eq!(sets.set_count(), 1);
    assert_eq!(sets.same_set(0, 999), Ok(true));
}

#[rstest]
#[case(1)]
#[case(3)]
fn components_match_planted_isolated_groups(#[case] concurrency: usize) {
    let fixture = PlantedPartition {
        communities: 6,
        community_size: 7,
        intra_probability: 1.0,
        inter_probability: 0.0,
        seed: 5,
    }
    .generate();
    let tracker = AllocationTracker::empty();
    let config = WccConfig {
        threshold: None,
        concurrency,
    };

    let components =
        weakly_connected_components(&csr_from(&fixture, &tracker), &config, &tracker)
            .expect("wcc run");
    let ids = components.ids().to_vec().expect("live array");
    assert_eq!(components.component_count(), 6);
    assert!(same_partition(&ids, &fixture.communities));
}

#[rstest]
fn adjacency_graph_matches_csr_graph() {
    let fixture = ring_of_cliques(5, 3);
    let tracker = AllocationTracker::empty();
    let config = WccConfig {
        threshold: Some(0.5),
        concurrency: 2,
    };

    let from_csr = weakly_connected_components(&csr_from(&fixture, &tracker), &config, &tracker)
        .expect("csr run");
    let from_lists =
        weakly_connected_components(&AdjacencyGraph::from_fixture(&fixture), &config, &tracker)
            .expect("adjacency run");
    assert_eq!(from_csr.ids().to_vec(), from_lists.ids().to_vec());
    assert_eq!(from_csr.component_count(), 1);
}

#[rstest]
fn wcc_rejects_zero_workers_and_records_span() {
    let fixture = ring_of_cliques(2, 3);
    let tracker = AllocationTracker::empty();
    let graph = csr_from(&fixture, &tracker);
    let config = WccConfig {
        threshold: None,
        concurrency: 0,
    };

    let (layer, result) =
        RecordingLayer::capture(|| weakly_connected_components(&graph, &config, &tracker));
    let error = result.expect_err("zero workers must be rejected");
    assert_eq!(error, WccError::InvalidConcurrency { got: 0 });
    assert_eq!(error.code(), WccErrorCode::InvalidConcurrency);

    let span = layer.span_named("core.wcc.run").expect("wcc span");
    assert_eq!(span.fields.get("node_count").map(String::as_str), Some("6"));
}
