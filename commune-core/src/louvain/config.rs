//! Configuration surface for [`Louvain`] runs.
//!
//! [`LouvainConfig`] is the plain settings struct the engine consumes;
//! [`LouvainBuilder`] fills it fluently and validates it before constructing
//! the engine.

use std::num::NonZeroUsize;

use crate::{Result, error::LouvainError, tracker::AllocationTracker};

use super::Louvain;

/// Default number of aggregation levels.
pub const DEFAULT_MAX_LEVELS: usize = 10;
/// Default number of local-moving passes per level.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
/// Default modularity improvement below which passes and levels stop.
pub const DEFAULT_MIN_MODULARITY_GAIN: f64 = 1e-7;
/// Default resolution parameter.
pub const DEFAULT_RESOLUTION: f64 = 1.0;

/// Order in which local moving visits nodes.
///
/// # Examples
/// ```
/// use commune_core::NodeOrder;
///
/// assert_eq!(NodeOrder::default(), NodeOrder::Natural);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NodeOrder {
    /// Ascending node id.
    #[default]
    Natural,
    /// A permutation drawn once per level. Reproducible when a seed is set.
    Shuffled,
}

/// How local moving schedules node visits.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LocalMoving {
    /// One worker visits every node; runs are reproducible.
    #[default]
    Sequential,
    /// The visiting order is split into `concurrency` disjoint batches that
    /// run on the global rayon pool. Workers may read community ids that
    /// another batch is about to change.
    Asynchronous,
}

/// Settings consumed by [`Louvain`].
///
/// Construct through [`LouvainBuilder`] or start from [`Default`] and call
/// [`LouvainConfig::validate`].
#[derive(Clone, Debug)]
pub struct LouvainConfig {
    /// Maximum number of levels kept in the dendrogram.
    pub max_levels: usize,
    /// Maximum number of local-moving passes per level.
    pub max_iterations: usize,
    /// Modularity improvement below which passes and levels stop.
    pub min_modularity_gain: f64,
    /// Resolution parameter scaling the null-model term.
    pub resolution: f64,
    /// Number of batches for [`LocalMoving::Asynchronous`].
    ///
    /// Batches run on the global rayon pool, so this caps parallelism
    /// rather than sizing a dedicated pool. Values above the node count
    /// yield one node per batch.
    pub concurrency: usize,
    /// Seed for [`NodeOrder::Shuffled`]. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Node visiting order.
    pub node_order: NodeOrder,
    /// Local-moving schedule.
    pub local_moving: LocalMoving,
    /// Reject graphs without nodes instead of returning a vacuous result.
    pub require_nodes: bool,
    /// Tracker receiving every allocation made by the run.
    pub tracker: AllocationTracker,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_modularity_gain: DEFAULT_MIN_MODULARITY_GAIN,
            resolution: DEFAULT_RESOLUTION,
            concurrency: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            seed: None,
            node_order: NodeOrder::Natural,
            local_moving: LocalMoving::Sequential,
            require_nodes: false,
            tracker: AllocationTracker::empty(),
        }
    }
}

impl LouvainConfig {
    /// Checks every numeric setting.
    ///
    /// # Errors
    /// Returns the matching `Invalid*` variant of [`LouvainError`] for zero
    /// levels, iterations, or workers, a resolution that is not finite and
    /// positive, or a gain threshold that is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.max_levels == 0 {
            return Err(LouvainError::InvalidMaxLevels {
                got: self.max_levels,
            });
        }
        if self.max_iterations == 0 {
            return Err(LouvainError::InvalidMaxIterations {
                got: self.max_iterations,
            });
        }
        if self.concurrency == 0 {
            return Err(LouvainError::InvalidConcurrency {
                got: self.concurrency,
            });
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(LouvainError::InvalidResolution {
                got: self.resolution,
            });
        }
        if !(self.min_modularity_gain.is_finite() && self.min_modularity_gain >= 0.0) {
            return Err(LouvainError::InvalidMinModularityGain {
                got: self.min_modularity_gain,
            });
        }
        Ok(())
    }
}

/// Configures and constructs [`Louvain`] engines.
///
/// # Examples
/// ```
/// use commune_core::{LocalMoving, LouvainBuilder, NodeOrder};
///
/// let louvain = LouvainBuilder::new()
///     .with_max_levels(4)
///     .with_node_order(NodeOrder::Shuffled)
///     .with_seed(42)
///     .with_local_moving(LocalMoving::Sequential)
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(louvain.config().max_levels, 4);
/// assert_eq!(louvain.config().seed, Some(42));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LouvainBuilder {
    config: LouvainConfig,
}

impl LouvainBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the maximum number of levels.
    #[must_use]
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.config.max_levels = max_levels;
        self
    }

    /// Overrides the maximum number of local-moving passes per level.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Overrides the minimum modularity improvement.
    #[must_use]
    pub fn with_min_modularity_gain(mut self, gain: f64) -> Self {
        self.config.min_modularity_gain = gain;
        self
    }

    /// Overrides the resolution parameter.
    #[must_use]
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Overrides the asynchronous batch count, which caps parallelism on the
    /// global rayon pool.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Fixes the shuffling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Selects the node visiting order.
    #[must_use]
    pub fn with_node_order(mut self, order: NodeOrder) -> Self {
        self.config.node_order = order;
        self
    }

    /// Selects the local-moving schedule.
    #[must_use]
    pub fn with_local_moving(mut self, mode: LocalMoving) -> Self {
        self.config.local_moving = mode;
        self
    }

    /// Rejects empty graphs with [`LouvainError::EmptyGraph`].
    #[must_use]
    pub fn with_require_nodes(mut self, require_nodes: bool) -> Self {
        self.config.require_nodes = require_nodes;
        self
    }

    /// Records the run's allocations against `tracker`.
    #[must_use]
    pub fn with_tracker(mut self, tracker: AllocationTracker) -> Self {
        self.config.tracker = tracker;
        self
    }

    /// Returns the configuration assembled so far.
    #[must_use]
    pub fn config(&self) -> &LouvainConfig {
        &self.config
    }

    /// Validates the configuration and constructs a [`Louvain`] engine.
    ///
    /// # Errors
    /// See [`LouvainConfig::validate`].
    pub fn build(self) -> Result<Louvain> {
        Louvain::new(self.config)
    }
}
