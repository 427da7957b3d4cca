//! Command implementations and argument parsing for the commune CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use commune_core::{
    AllocationTracker, CancellationToken, Graph, GraphError, LocalMoving, Louvain, LouvainBuilder,
    LouvainError, NodeOrder, RunStatus, WccConfig, WccError, estimate_louvain_bytes,
    estimate_wcc_bytes, format_bytes, weakly_connected_components,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::input::load_edge_list;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "commune", about = "Detect communities in large graphs.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run multi-level Louvain community detection.
    Louvain(LouvainCommand),
    /// Label weakly connected components.
    Wcc(WccCommand),
    /// Estimate the memory a run would reserve.
    Estimate(EstimateCommand),
}

/// Input options shared by graph commands.
#[derive(Debug, Args, Clone)]
pub struct GraphArgs {
    /// Edge list with one `source target [weight]` relationship per line.
    pub path: PathBuf,

    /// Node count; defaults to one past the largest id in the file.
    #[arg(long)]
    pub nodes: Option<usize>,

    /// Refuse to run when the estimated memory exceeds this size
    /// (e.g. `512M`, `2GiB`).
    #[arg(long = "max-bytes", value_parser = parse_byte_size)]
    pub max_bytes: Option<u64>,
}

/// Options accepted by the `louvain` command.
#[derive(Debug, Args, Clone)]
pub struct LouvainCommand {
    /// Graph input.
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Maximum number of levels kept.
    #[arg(long = "max-levels", default_value_t = commune_core::DEFAULT_MAX_LEVELS)]
    pub max_levels: usize,

    /// Maximum local-moving passes per level.
    #[arg(long = "max-iterations", default_value_t = commune_core::DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Modularity improvement below which passes and levels stop.
    #[arg(long = "min-gain", default_value_t = commune_core::DEFAULT_MIN_MODULARITY_GAIN)]
    pub min_modularity_gain: f64,

    /// Resolution parameter.
    #[arg(long, default_value_t = commune_core::DEFAULT_RESOLUTION)]
    pub resolution: f64,

    /// Asynchronous batch count; defaults to the available parallelism.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Visit nodes in a shuffled order.
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for `--shuffle`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Move nodes concurrently with relaxed consistency.
    #[arg(long)]
    pub asynchronous: bool,

    /// Print the community of every node at every level, not only the last.
    #[arg(long = "all-levels")]
    pub all_levels: bool,
}

/// Options accepted by the `wcc` command.
#[derive(Debug, Args, Clone)]
pub struct WccCommand {
    /// Graph input.
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Only relationships heavier than this join their endpoints.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Worker count; defaults to the available parallelism.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Options accepted by the `estimate` command.
#[derive(Debug, Args, Clone, Copy)]
pub struct EstimateCommand {
    /// Number of nodes.
    #[arg(long)]
    pub nodes: usize,

    /// Number of undirected relationships.
    #[arg(long)]
    pub relationships: usize,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading an input.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// An edge-list line could not be parsed.
    #[error("{path}:{line}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number; zero for whole-file problems.
        line: usize,
        /// Description of the problem.
        message: String,
    },
    /// The estimated memory exceeds `--max-bytes`.
    #[error("estimated memory of {estimated} bytes exceeds the limit of {limit} bytes")]
    MemoryLimitExceeded {
        /// Estimated bytes for the run.
        estimated: u64,
        /// Configured limit.
        limit: u64,
    },
    /// Building the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Community detection failed.
    #[error(transparent)]
    Louvain(#[from] LouvainError),
    /// Component labelling failed.
    #[error(transparent)]
    Wcc(#[from] WccError),
}

impl CliError {
    /// Stable code of the underlying library error, if any.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Graph(error) => Some(error.code().as_str()),
            Self::Louvain(error) => Some(error.code().as_str()),
            Self::Wcc(error) => Some(error.code().as_str()),
            Self::Io { .. } | Self::Parse { .. } | Self::MemoryLimitExceeded { .. } => None,
        }
    }
}

/// One level of a Louvain summary.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    /// Number of communities.
    pub communities: usize,
    /// Modularity of the level's partition.
    pub modularity: f64,
    /// Local-moving passes run.
    pub iterations: usize,
    /// Whether local moving converged before its pass limit.
    pub converged: bool,
}

/// Outcome of a command, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionSummary {
    /// Louvain dendrogram.
    Louvain {
        /// Input name.
        source: String,
        /// Completed levels, innermost first.
        levels: Vec<LevelSummary>,
        /// Whether the run completed.
        status: RunStatus,
        /// Community of every node, one row per printed level.
        assignments: Vec<Vec<usize>>,
        /// Peak bytes tracked during the run.
        peak_bytes: u64,
    },
    /// Connected components.
    Components {
        /// Input name.
        source: String,
        /// Number of components.
        component_count: usize,
        /// Component of every node.
        assignments: Vec<usize>,
    },
    /// Memory estimate.
    Estimate {
        /// Bytes for a Louvain run.
        louvain_bytes: u64,
        /// Bytes for a connected-components run.
        wcc_bytes: u64,
    },
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading the input or running the algorithm
/// fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use commune_cli::cli::{Cli, Command, EstimateCommand, ExecutionSummary, run_cli};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let cli = Cli {
///     command: Command::Estimate(EstimateCommand {
///         nodes: 1_000,
///         relationships: 5_000,
///     }),
/// };
/// let summary = run_cli(cli, &Default::default())?;
/// assert!(matches!(summary, ExecutionSummary::Estimate { louvain_bytes, .. } if louvain_bytes > 0));
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli, cancellation),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli, cancellation: &CancellationToken) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Louvain(command) => {
            span.record("command", "louvain");
            run_louvain(&command, cancellation)
        }
        Command::Wcc(command) => {
            span.record("command", "wcc");
            run_wcc(&command)
        }
        Command::Estimate(command) => {
            span.record("command", "estimate");
            Ok(run_estimate(command))
        }
    }
}

fn louvain_builder(command: &LouvainCommand, tracker: &AllocationTracker) -> LouvainBuilder {
    let mut builder = Louvain::builder()
        .with_max_levels(command.max_levels)
        .with_max_iterations(command.max_iterations)
        .with_min_modularity_gain(command.min_modularity_gain)
        .with_resolution(command.resolution)
        .with_tracker(tracker.clone());
    if let Some(concurrency) = command.concurrency {
        builder = builder.with_concurrency(concurrency);
    }
    if let Some(seed) = command.seed {
        builder = builder.with_seed(seed);
    }
    if command.shuffle {
        builder = builder.with_node_order(NodeOrder::Shuffled);
    }
    if command.asynchronous {
        builder = builder.with_local_moving(LocalMoving::Asynchronous);
    }
    builder
}

fn check_memory(estimated: u64, limit: Option<u64>) -> Result<(), CliError> {
    match limit {
        Some(limit) if estimated > limit => {
            Err(CliError::MemoryLimitExceeded { estimated, limit })
        }
        _ => Ok(()),
    }
}

#[instrument(
    name = "cli.louvain",
    err,
    skip(command, cancellation),
    fields(path = %command.graph.path.display(), estimated_bytes = field::Empty),
)]
pub(super) fn run_louvain(
    command: &LouvainCommand,
    cancellation: &CancellationToken,
) -> Result<ExecutionSummary, CliError> {
    let tracker = AllocationTracker::new();
    let louvain = louvain_builder(command, &tracker).build()?;
    let edges = load_edge_list(&command.graph.path, command.graph.nodes)?;
    let estimated = estimate_louvain_bytes(
        edges.node_count,
        edges.relationships.len().saturating_mul(2),
    );
    Span::current().record("estimated_bytes", estimated);
    check_memory(estimated, command.graph.max_bytes)?;

    let graph = edges.to_graph(&tracker)?;
    let result = louvain.run_with_cancellation(&graph, cancellation)?;

    let levels: Vec<LevelSummary> = result
        .levels()
        .iter()
        .map(|level| LevelSummary {
            communities: level.community_count(),
            modularity: level.modularity(),
            iterations: level.iterations(),
            converged: level.converged(),
        })
        .collect();
    let printed: Vec<usize> = if command.all_levels {
        (0..result.level_count()).collect()
    } else {
        result.level_count().checked_sub(1).into_iter().collect()
    };
    let assignments: Vec<Vec<usize>> = printed
        .into_iter()
        .map(|level| -> Result<Vec<usize>, CliError> {
            let flattened = result.flatten(level, &tracker)?;
            Ok(flattened.to_vec().map_err(LouvainError::from)?)
        })
        .collect::<Result<_, _>>()?;

    info!(
        levels = levels.len(),
        modularity = result.final_modularity(),
        peak = %format_bytes(tracker.peak_bytes()),
        "louvain completed"
    );
    Ok(ExecutionSummary::Louvain {
        source: command.graph.path.display().to_string(),
        levels,
        status: result.status(),
        assignments,
        peak_bytes: tracker.peak_bytes(),
    })
}

#[instrument(
    name = "cli.wcc",
    err,
    skip(command),
    fields(path = %command.graph.path.display()),
)]
pub(super) fn run_wcc(command: &WccCommand) -> Result<ExecutionSummary, CliError> {
    let edges = load_edge_list(&command.graph.path, command.graph.nodes)?;
    check_memory(estimate_wcc_bytes(edges.node_count), command.graph.max_bytes)?;
    let tracker = AllocationTracker::new();
    let graph = edges.to_graph(&tracker)?;
    let mut config = WccConfig {
        threshold: command.threshold,
        ..WccConfig::default()
    };
    if let Some(concurrency) = command.concurrency {
        config.concurrency = concurrency;
    }
    let components = weakly_connected_components(&graph, &config, &tracker)?;
    let assignments = components.ids().to_vec().map_err(WccError::from)?;
    info!(
        nodes = graph.node_count(),
        components = components.component_count(),
        "wcc completed"
    );
    Ok(ExecutionSummary::Components {
        source: command.graph.path.display().to_string(),
        component_count: components.component_count(),
        assignments,
    })
}

pub(super) fn run_estimate(command: EstimateCommand) -> ExecutionSummary {
    ExecutionSummary::Estimate {
        louvain_bytes: estimate_louvain_bytes(
            command.nodes,
            command.relationships.saturating_mul(2),
        ),
        wcc_bytes: estimate_wcc_bytes(command.nodes),
    }
}

/// Parses a byte size such as `1024`, `64K`, `512MiB` or `2GB`.
///
/// Suffixes are binary multiples and case-insensitive.
///
/// # Errors
/// Returns a message for empty input, unknown suffixes, non-integer values
/// and sizes that overflow `u64`.
pub fn parse_byte_size(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(format!("`{raw}` does not start with a number"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|error| format!("invalid size `{raw}`: {error}"))?;
    let shift = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        other => return Err(format!("unknown size suffix `{other}`")),
    };
    value
        .checked_mul(1_u64 << shift)
        .ok_or_else(|| format!("size `{raw}` overflows 64 bits"))
}

/// Renders `summary` to `writer` in a tab-separated text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use commune_cli::cli::{ExecutionSummary, render_summary};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Components {
///     source: "demo".into(),
///     component_count: 2,
///     assignments: vec![0, 0, 1],
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "source: demo\ncomponents: 2\n0\t0\n1\t0\n2\t1\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Louvain {
            source,
            levels,
            status,
            assignments,
            peak_bytes,
        } => {
            writeln!(writer, "source: {source}")?;
            writeln!(writer, "status: {}", status_label(*status))?;
            writeln!(writer, "peak memory: {}", format_bytes(*peak_bytes))?;
            for (index, level) in levels.iter().enumerate() {
                writeln!(
                    writer,
                    "level {index}: communities={} modularity={:.6} iterations={} converged={}",
                    level.communities, level.modularity, level.iterations, level.converged
                )?;
            }
            for (node, row) in transpose(assignments).into_iter().enumerate() {
                write!(writer, "{node}")?;
                for community in row {
                    write!(writer, "\t{community}")?;
                }
                writeln!(writer)?;
            }
        }
        ExecutionSummary::Components {
            source,
            component_count,
            assignments,
        } => {
            writeln!(writer, "source: {source}")?;
            writeln!(writer, "components: {component_count}")?;
            for (node, component) in assignments.iter().enumerate() {
                writeln!(writer, "{node}\t{component}")?;
            }
        }
        ExecutionSummary::Estimate {
            louvain_bytes,
            wcc_bytes,
        } => {
            writeln!(writer, "louvain: {}", format_bytes(*louvain_bytes))?;
            writeln!(writer, "wcc: {}", format_bytes(*wcc_bytes))?;
        }
    }
    Ok(())
}

const fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled",
    }
}

/// Turns per-level rows into per-node rows.
fn transpose(levels: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let node_count = levels.first().map_or(0, Vec::len);
    (0..node_count)
        .map(|node| levels.iter().filter_map(|row| row.get(node).copied()).collect())
        .collect()
}
