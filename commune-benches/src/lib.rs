//! Benchmark support crate for commune.
//!
//! Generates synthetic community-structured graphs and bundles the
//! parameter and error types shared by the Criterion benchmarks for Louvain,
//! paged arrays and union-find.

pub mod error;
pub mod params;
pub mod source;
