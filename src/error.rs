use thiserror::Error;

/// Result alias for `gaussmix`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by point containers, clustering and the loaders.
///
/// Density evaluation never returns one of these: a degenerate fit shows up
/// as a non-finite density instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Point length does not match the dimension of the set.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Index outside `[0, len)`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of addressable items.
        len: usize,
    },

    /// The cluster engine was asked to run before a source was set.
    #[error("no source point set configured")]
    NoSource,

    /// The source points have dimension 0.
    #[error("source points have dimension 0")]
    ZeroDimension,

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Every centroid redraw still left at least one cluster empty.
    #[error("no partition without empty clusters after {attempts} centroid draws")]
    EmptyPartition {
        /// Number of centroid draws attempted.
        attempts: usize,
    },

    /// Outlier pruning removed every cluster.
    #[error("no clusters left after pruning")]
    NoClusters,

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON line could not be parsed.
    #[error("invalid json on line {line}: {source}")]
    Json {
        /// 1-based line number.
        line: usize,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}
