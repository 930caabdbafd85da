//! Crate-wide error taxonomy for synthdb.

use crate::augment::error::AugmentError;
use crate::cluster::error::ClusterError;
use crate::quality::error::QualityError;
use crate::sandbox::error::SandboxError;

/// Configuration errors detected before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// synthdb errors.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("clustering error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("quality error: {0}")]
    Quality(#[from] QualityError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("augmentation error: {0}")]
    Augment(#[from] AugmentError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for synthdb operations.
pub type Result<T> = std::result::Result<T, SynthError>;
