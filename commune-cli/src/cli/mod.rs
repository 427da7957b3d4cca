//! Command-line interface orchestration for commune.
//!
//! Three commands are offered: `louvain` detects communities in an edge list,
//! `wcc` labels its weakly connected components and `estimate` reports the
//! memory either run would reserve without reading any input.

mod commands;
mod input;

pub use commands::{
    Cli, CliError, Command, EstimateCommand, ExecutionSummary, GraphArgs, LevelSummary,
    LouvainCommand, WccCommand, parse_byte_size, render_summary, run_cli,
};
pub use input::{EdgeList, load_edge_list};

#[cfg(test)]
mod tests;
