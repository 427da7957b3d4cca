//! Benchmark parameter types.
//!
//! Each struct renders as a compact Criterion parameter label.

use std::fmt;

use commune_core::{Layout, LocalMoving};

/// Parameters for a Louvain benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct LouvainBenchParams {
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Local-moving mode.
    pub local_moving: LocalMoving,
    /// Worker count.
    pub concurrency: usize,
}

impl fmt::Display for LouvainBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.local_moving {
            LocalMoving::Sequential => "seq",
            LocalMoving::Asynchronous => "async",
        };
        write!(
            f,
            "n={},mode={mode},workers={}",
            self.node_count, self.concurrency
        )
    }
}

/// Parameters for a paged-array access benchmark.
#[derive(Clone, Copy, Debug)]
pub struct ArrayBenchParams {
    /// Number of elements.
    pub length: usize,
    /// Physical layout under test.
    pub layout: Layout,
}

impl fmt::Display for ArrayBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self.layout {
            Layout::Single => "single",
            Layout::Paged => "paged",
        };
        write!(f, "len={},layout={layout}", self.length)
    }
}

/// Parameters for a connected-components benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct WccBenchParams {
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Worker count.
    pub concurrency: usize,
}

impl fmt::Display for WccBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},workers={}", self.node_count, self.concurrency)
    }
}
