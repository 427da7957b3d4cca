//! Commune core library.
//!
//! Paged storage with allocation accounting, union-find based connected
//! components, and multi-level Louvain community detection over compressed
//! sparse row graphs.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cancel;
mod dss;
mod error;
mod graph;
mod louvain;
mod memory;
mod paged;
mod tracker;

#[cfg(test)]
mod test_utils;

pub use crate::{
    cancel::CancellationToken,
    dss::{
        ComponentAssignment, ConcurrentDisjointSetStruct, DisjointSetStruct, UnionStrategy,
        WccConfig, weakly_connected_components,
    },
    error::{
        GraphError, GraphErrorCode, LouvainError, LouvainErrorCode, PagedArrayError,
        PagedArrayErrorCode, Result, WccError, WccErrorCode,
    },
    graph::{CsrGraph, CsrGraphBuilder, Graph, NodeId},
    louvain::{
        DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_LEVELS, DEFAULT_MIN_MODULARITY_GAIN,
        DEFAULT_RESOLUTION, LocalMoving, Louvain, LouvainBuilder, LouvainConfig, LouvainLevel,
        LouvainResult, NodeOrder, RunStatus, modularity,
    },
    memory::{estimate_louvain_bytes, estimate_wcc_bytes, format_bytes},
    paged::{
        AtomicF64, AtomicSlot, Element, Layout, MAX_SINGLE_LENGTH, PagedArray, PagedAtomicArray,
        Pages,
    },
    tracker::AllocationTracker,
};
