//! Benchmark setup error type.
//!
//! Setup code propagates failures with `?` so benchmarks never call
//! `.expect()` while building their inputs.

use commune_core::{GraphError, LouvainError, PagedArrayError, WccError};

use crate::source::SyntheticError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic graph generation failed.
    #[error("synthetic graph generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Building the CSR graph failed.
    #[error("graph construction failed: {0}")]
    Graph(#[from] GraphError),
    /// Louvain configuration or execution failed.
    #[error("louvain failed: {0}")]
    Louvain(#[from] LouvainError),
    /// Connected-components configuration or execution failed.
    #[error("connected components failed: {0}")]
    Wcc(#[from] WccError),
    /// Allocating or accessing a paged array failed.
    #[error("paged array operation failed: {0}")]
    Storage(#[from] PagedArrayError),
}
