//! Error types for the Commune core library.
//!
//! Defines error enums exposed by the public API, their stable
//! machine-readable codes, and a convenient result alias for Louvain runs.

use std::fmt;

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by paged array storage.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PagedArrayError {
    /// The requested length cannot be addressed for the element type.
    #[error("cannot allocate {requested} elements; the limit for this layout is {limit}")]
    CapacityExceeded {
        /// Number of elements requested by the caller.
        requested: usize,
        /// Largest length the selected layout can address.
        limit: usize,
    },
    /// An index fell outside `[0, length)`.
    #[error("index {index} is out of range for length {length}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Logical length of the array.
        length: usize,
    },
    /// A plain copy-out was requested for an array too long for one block.
    #[error("array of length {length} exceeds the plain-array limit {limit}; iterate pages instead")]
    UnsupportedForPagedLayout {
        /// Logical length of the array.
        length: usize,
        /// Largest length that fits a single contiguous block.
        limit: usize,
    },
    /// The array was accessed after [`crate::PagedArray::release`].
    #[error("array was accessed after being released")]
    UseAfterRelease,
    /// A bulk copy targeted an array shorter than the source.
    #[error("destination length {destination} is shorter than source length {source_length}")]
    LengthMismatch {
        /// Length of the array being copied.
        source_length: usize,
        /// Length of the destination array.
        destination: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`PagedArrayError`] variants.
    enum PagedArrayErrorCode for PagedArrayError {
        /// The requested length cannot be addressed for the element type.
        CapacityExceeded => CapacityExceeded { .. } => "PAGED_CAPACITY_EXCEEDED",
        /// An index fell outside the array bounds.
        IndexOutOfRange => IndexOutOfRange { .. } => "PAGED_INDEX_OUT_OF_RANGE",
        /// A plain copy-out was requested for an oversized array.
        UnsupportedForPagedLayout => UnsupportedForPagedLayout { .. } => "PAGED_UNSUPPORTED_FOR_PAGED_LAYOUT",
        /// The array was accessed after release.
        UseAfterRelease => UseAfterRelease => "PAGED_USE_AFTER_RELEASE",
        /// A bulk copy targeted a shorter array.
        LengthMismatch => LengthMismatch { .. } => "PAGED_LENGTH_MISMATCH",
    }
}

/// An error produced while building or traversing a [`crate::Graph`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    /// A relationship or lookup referenced a node outside `[0, node_count)`.
    #[error("node {node} is out of range for a graph with {node_count} nodes")]
    InvalidNodeId {
        /// The offending node id.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// A relationship carried a NaN or infinite weight.
    #[error("relationship ({source_node}, {target_node}) has non-finite weight {weight}")]
    NonFiniteWeight {
        /// Source endpoint of the relationship.
        source_node: usize,
        /// Target endpoint of the relationship.
        target_node: usize,
        /// The rejected weight.
        weight: f64,
    },
    /// Backing storage failed.
    #[error(transparent)]
    Storage(#[from] PagedArrayError),
}

define_error_codes! {
    /// Stable codes describing [`GraphError`] variants.
    enum GraphErrorCode for GraphError {
        /// A node id was out of range.
        InvalidNodeId => InvalidNodeId { .. } => "GRAPH_INVALID_NODE_ID",
        /// A relationship weight was NaN or infinite.
        NonFiniteWeight => NonFiniteWeight { .. } => "GRAPH_NON_FINITE_WEIGHT",
        /// Backing storage failed.
        Storage => Storage(..) => "GRAPH_STORAGE",
    }
}

/// Error type produced when configuring or running [`crate::Louvain`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LouvainError {
    /// `max_levels` must be at least one.
    #[error("max_levels must be at least 1 (got {got})")]
    InvalidMaxLevels {
        /// The rejected value.
        got: usize,
    },
    /// `max_iterations` must be at least one.
    #[error("max_iterations must be at least 1 (got {got})")]
    InvalidMaxIterations {
        /// The rejected value.
        got: usize,
    },
    /// `concurrency` must be at least one.
    #[error("concurrency must be at least 1 (got {got})")]
    InvalidConcurrency {
        /// The rejected value.
        got: usize,
    },
    /// `resolution` must be finite and strictly positive.
    #[error("resolution must be finite and positive (got {got})")]
    InvalidResolution {
        /// The rejected value.
        got: f64,
    },
    /// `min_modularity_gain` must be finite and non-negative.
    #[error("min_modularity_gain must be finite and non-negative (got {got})")]
    InvalidMinModularityGain {
        /// The rejected value.
        got: f64,
    },
    /// The graph has no nodes and the configuration requires at least one.
    #[error("graph contains no nodes")]
    EmptyGraph,
    /// Modularity evaluated to NaN or infinity.
    #[error("modularity is not finite at level {level}")]
    NonFiniteModularity {
        /// Level whose evaluation failed.
        level: usize,
    },
    /// A result accessor asked for a level that was never computed.
    #[error("level {level} is out of range; the result has {level_count} levels")]
    LevelOutOfRange {
        /// The requested level.
        level: usize,
        /// Number of completed levels.
        level_count: usize,
    },
    /// Traversing the input graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Paged storage failed.
    #[error(transparent)]
    Storage(#[from] PagedArrayError),
}

define_error_codes! {
    /// Stable codes describing [`LouvainError`] variants.
    enum LouvainErrorCode for LouvainError {
        /// `max_levels` was zero.
        InvalidMaxLevels => InvalidMaxLevels { .. } => "LOUVAIN_INVALID_MAX_LEVELS",
        /// `max_iterations` was zero.
        InvalidMaxIterations => InvalidMaxIterations { .. } => "LOUVAIN_INVALID_MAX_ITERATIONS",
        /// `concurrency` was zero.
        InvalidConcurrency => InvalidConcurrency { .. } => "LOUVAIN_INVALID_CONCURRENCY",
        /// `resolution` was not finite and positive.
        InvalidResolution => InvalidResolution { .. } => "LOUVAIN_INVALID_RESOLUTION",
        /// `min_modularity_gain` was negative or not finite.
        InvalidMinModularityGain => InvalidMinModularityGain { .. } => "LOUVAIN_INVALID_MIN_MODULARITY_GAIN",
        /// The graph had no nodes.
        EmptyGraph => EmptyGraph => "LOUVAIN_EMPTY_GRAPH",
        /// Modularity was NaN or infinite.
        NonFiniteModularity => NonFiniteModularity { .. } => "LOUVAIN_NON_FINITE_MODULARITY",
        /// A level accessor was out of range.
        LevelOutOfRange => LevelOutOfRange { .. } => "LOUVAIN_LEVEL_OUT_OF_RANGE",
        /// Traversing the input graph failed.
        Graph => Graph(..) => "LOUVAIN_GRAPH",
        /// Paged storage failed.
        Storage => Storage(..) => "LOUVAIN_STORAGE",
    }
}

impl LouvainError {
    /// Retrieve the inner [`PagedArrayErrorCode`] when the failure originated
    /// in paged storage, directly or through the graph.
    #[must_use]
    pub const fn storage_code(&self) -> Option<PagedArrayErrorCode> {
        match self {
            Self::Storage(error) | Self::Graph(GraphError::Storage(error)) => Some(error.code()),
            _ => None,
        }
    }
}

/// Error type produced by [`crate::weakly_connected_components`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WccError {
    /// The relationship weight threshold was NaN or infinite.
    #[error("threshold must be finite (got {got})")]
    InvalidThreshold {
        /// The rejected threshold.
        got: f64,
    },
    /// `concurrency` must be at least one.
    #[error("concurrency must be at least 1 (got {got})")]
    InvalidConcurrency {
        /// The rejected value.
        got: usize,
    },
    /// Traversing the input graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Paged storage failed.
    #[error(transparent)]
    Storage(#[from] PagedArrayError),
}

define_error_codes! {
    /// Stable codes describing [`WccError`] variants.
    enum WccErrorCode for WccError {
        /// The threshold was not finite.
        InvalidThreshold => InvalidThreshold { .. } => "WCC_INVALID_THRESHOLD",
        /// `concurrency` was zero.
        InvalidConcurrency => InvalidConcurrency { .. } => "WCC_INVALID_CONCURRENCY",
        /// Traversing the input graph failed.
        Graph => Graph(..) => "WCC_GRAPH",
        /// Paged storage failed.
        Storage => Storage(..) => "WCC_STORAGE",
    }
}

/// Convenient alias for results returned by the Louvain API.
pub type Result<T> = core::result::Result<T, LouvainError>;
