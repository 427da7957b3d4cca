//! Edge-list ingestion.
//!
//! One relationship per line: `source target [weight]`, separated by
//! whitespace or commas. Blank lines and lines starting with `#` or `%` are
//! skipped. Node ids are zero-based; the node count is one past the largest id
//! unless overridden.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use commune_core::{AllocationTracker, CsrGraph, NodeId};
use tracing::{Span, debug, field, instrument};

use super::CliError;

/// Relationships parsed from an edge list.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeList {
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Parsed `(source, target, weight)` triples.
    pub relationships: Vec<(NodeId, NodeId, f64)>,
    /// `true` when at least one line carried an explicit weight.
    pub weighted: bool,
}

impl EdgeList {
    /// Parses `reader`, attributing errors to `path`.
    ///
    /// # Errors
    /// Returns [`CliError::Io`] when reading fails and [`CliError::Parse`] for
    /// malformed lines or a node count smaller than the ids used.
    pub fn parse(
        reader: impl BufRead,
        path: &Path,
        node_count: Option<usize>,
    ) -> Result<Self, CliError> {
        let mut relationships = Vec::new();
        let mut weighted = false;
        let mut max_id = None;
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let parse_error = |message: String| CliError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                message,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                continue;
            }
            let tokens: Vec<&str> = trimmed
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .collect();
            let (source, target, weight) = match tokens.as_slice() {
                [source, target] => (*source, *target, None),
                [source, target, weight] => (*source, *target, Some(*weight)),
                _ => {
                    return Err(parse_error(format!(
                        "expected `source target [weight]`, found {} fields",
                        tokens.len()
                    )));
                }
            };
            let source = parse_node(source).map_err(parse_error)?;
            let target = parse_node(target).map_err(parse_error)?;
            let weight = match weight {
                Some(raw) => {
                    weighted = true;
                    parse_weight(raw).map_err(parse_error)?
                }
                None => 1.0,
            };
            max_id = max_id.max(Some(source.max(target)));
            relationships.push((source, target, weight));
        }

        let required = max_id.map_or(0, |id| id + 1);
        let node_count = match node_count {
            Some(count) if count < required => {
                return Err(CliError::Parse {
                    path: path.to_path_buf(),
                    line: 0,
                    message: format!("node count {count} is smaller than the {required} ids used"),
                });
            }
            Some(count) => count,
            None => required,
        };
        Ok(Self {
            node_count,
            relationships,
            weighted,
        })
    }

    /// Builds a CSR graph charged to `tracker`.
    ///
    /// # Errors
    /// Returns [`CliError::Graph`] when construction fails.
    pub fn to_graph(&self, tracker: &AllocationTracker) -> Result<CsrGraph, CliError> {
        let graph = if self.weighted {
            CsrGraph::from_relationships(self.node_count, &self.relationships, tracker)?
        } else {
            let pairs: Vec<_> = self
                .relationships
                .iter()
                .map(|&(source, target, _)| (source, target))
                .collect();
            CsrGraph::from_unweighted(self.node_count, &pairs, tracker)?
        };
        Ok(graph)
    }
}

fn parse_node(raw: &str) -> Result<NodeId, String> {
    raw.parse::<NodeId>()
        .map_err(|error| format!("invalid node id `{raw}`: {error}"))
}

fn parse_weight(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(weight) if weight.is_finite() => Ok(weight),
        Ok(_) => Err(format!("weight `{raw}` is not finite")),
        Err(error) => Err(format!("invalid weight `{raw}`: {error}")),
    }
}

/// Opens and parses the edge list at `path`.
///
/// # Errors
/// See [`EdgeList::parse`].
#[instrument(
    name = "cli.load_edge_list",
    err,
    fields(path = field::Empty, relationships = field::Empty),
)]
pub fn load_edge_list(path: &Path, node_count: Option<usize>) -> Result<EdgeList, CliError> {
    let span = Span::current();
    span.record("path", field::display(path.display()));
    let file = File::open(path).map_err(|source| CliError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    let edges = EdgeList::parse(BufReader::new(file), path, node_count)?;
    span.record("relationships", edges.relationships.len());
    debug!(
        node_count = edges.node_count,
        weighted = edges.weighted,
        "edge list loaded"
    );
    Ok(edges)
}
