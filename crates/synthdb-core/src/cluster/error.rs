//! Error types for the cluster module.

/// Errors produced while partitioning vectors.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("invalid partition configuration: {0}")]
    InvalidConfig(String),

    #[error("empty vector set provided for clustering")]
    EmptyVectorSet,

    #[error("invalid cluster count {k} for {n} vectors")]
    InvalidClusterCount { k: usize, n: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("vector {index} contains a non-finite value")]
    NonFiniteValue { index: usize },

    #[error("ids and vectors differ in length: {ids} ids, {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("duplicate id in embedding set: {0}")]
    DuplicateId(String),

    #[error("centroid set is empty")]
    EmptyCentroidSet,

    #[error("split of a group of {size} into {k} clusters did not shrink it")]
    NonShrinkingSplit { size: usize, k: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cluster operations.
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;
