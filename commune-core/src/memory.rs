//! Pre-flight memory estimation for community detection.
//!
//! Provides conservative estimates of the paged storage a run reserves so
//! callers can reject oversized graphs before any allocation occurs. The
//! figures are derived from [`PagedArray::memory_estimation`], so they follow
//! the same single/paged layout decision the algorithms make at runtime.

use crate::paged::PagedArray;

/// Safety multiplier (3/2) covering hash-map scratch space, rayon worker
/// buffers, and the transient overlap of two levels during aggregation.
const SAFETY_MULTIPLIER_NUMERATOR: u64 = 3;
const SAFETY_MULTIPLIER_DENOMINATOR: u64 = 2;

fn with_safety_margin(bytes: u64) -> u64 {
    bytes
        .saturating_mul(SAFETY_MULTIPLIER_NUMERATOR)
        .saturating_div(SAFETY_MULTIPLIER_DENOMINATOR)
}

/// Returns a conservative estimate of peak memory (in bytes) for a Louvain
/// run over `node_count` nodes and `relationship_count` adjacency entries.
///
/// `relationship_count` counts each undirected relationship once per endpoint,
/// matching [`crate::Graph::relationship_count`].
///
/// The estimate covers per-node state during local moving (community ids,
/// their atomic working copy, node volumes, community totals, and the visiting
/// order), the aggregated graph of the first level, and the community arrays
/// retained for every level.
///
/// # Examples
///
/// ```
/// use commune_core::estimate_louvain_bytes;
///
/// let small = estimate_louvain_bytes(1_000, 10_000);
/// let large = estimate_louvain_bytes(1_000, 100_000);
/// assert!(large > small);
/// assert_eq!(estimate_louvain_bytes(0, 0), 0);
/// ```
#[must_use]
pub fn estimate_louvain_bytes(node_count: usize, relationship_count: usize) -> u64 {
    if node_count == 0 {
        return 0;
    }
    let ids = PagedArray::<usize>::memory_estimation(node_count);
    let doubles = PagedArray::<f64>::memory_estimation(node_count);
    let offsets = PagedArray::<usize>::memory_estimation(node_count.saturating_add(1));

    // communities, their atomic copy, and the visiting order
    let moving_ids = ids.saturating_mul(3);
    // node volumes and community totals
    let moving_doubles = doubles.saturating_mul(2);
    // member offsets, members, and the aggregated CSR offsets
    let aggregation_index = offsets.saturating_mul(2).saturating_add(ids);
    let aggregated_relationships = PagedArray::<usize>::memory_estimation(relationship_count)
        .saturating_add(PagedArray::<f64>::memory_estimation(relationship_count));
    // Later levels shrink geometrically, so their assignments sum to about
    // one more node-sized array.
    let retained_levels = ids.saturating_mul(2);

    with_safety_margin(
        moving_ids
            .saturating_add(moving_doubles)
            .saturating_add(aggregation_index)
            .saturating_add(aggregated_relationships)
            .saturating_add(retained_levels),
    )
}

/// Returns a conservative estimate of peak memory (in bytes) for weakly
/// connected components over `node_count` nodes.
///
/// # Examples
///
/// ```
/// use commune_core::estimate_wcc_bytes;
///
/// assert!(estimate_wcc_bytes(1_000) >= 3 * 8_000);
/// ```
#[must_use]
pub fn estimate_wcc_bytes(node_count: usize) -> u64 {
    if node_count == 0 {
        return 0;
    }
    // parents, set sizes, and the relabelled output
    let parents = PagedArray::<usize>::memory_estimation(node_count);
    let sizes = PagedArray::<u64>::memory_estimation(node_count);
    with_safety_margin(parents.saturating_mul(2).saturating_add(sizes))
}

/// Formats a byte count as a human-readable string using binary units.
///
/// Values below 1 KiB print as whole bytes; larger values keep one decimal
/// place.
///
/// # Examples
///
/// ```
/// use commune_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5 MiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut scaled = bytes as f64 / 1024.0;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }
    format!("{scaled:.1} {}", UNITS[unit])
}
