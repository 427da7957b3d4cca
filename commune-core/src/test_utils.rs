//! Shared test utilities for `commune-core`.

use std::collections::VecDeque;

use commune_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;

/// Builds a standard proptest configuration from the shared CI profile.
///
/// This keeps property suites aligned on the same `PROGTEST_CASES` and
/// `COMMUNE_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Breadth-first component labelling used as an oracle for union-find.
///
/// Components are numbered in order of their lowest node, so the result is
/// comparable with any first-seen dense relabelling.
#[must_use]
pub(crate) fn naive_components(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adjacency = vec![Vec::new(); node_count];
    for &(source, target) in edges {
        adjacency[source].push(target);
        adjacency[target].push(source);
    }
    let mut labels = vec![usize::MAX; node_count];
    let mut next = 0;
    let mut queue = VecDeque::new();
    for start in 0..node_count {
        if labels[start] != usize::MAX {
            continue;
        }
        labels[start] = next;
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for &neighbour in &adjacency[node] {
                if labels[neighbour] == usize::MAX {
                    labels[neighbour] = next;
                    queue.push_back(neighbour);
                }
            }
        }
        next += 1;
    }
    labels
}
