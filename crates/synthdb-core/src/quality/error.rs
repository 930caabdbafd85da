//! Error types for the quality module.

/// Errors produced while building or running quality rules.
///
/// Construction-time errors (`UnknownRule`, `InvalidParam`) surface from
/// [`QualityGate::new`](super::gate::QualityGate::new); evaluation-time errors
/// are folded into an `engine_error` finding and never escape `evaluate`.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error("unknown rule identifier: {0}")]
    UnknownRule(String),

    #[error("invalid parameter {param} for rule {rule}: {reason}")]
    InvalidParam {
        rule: String,
        param: String,
        reason: String,
    },

    #[error("table not found: {0}")]
    MissingTable(String),

    #[error("unsupported schema: {0}")]
    InvalidSchema(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for quality operations.
pub type QualityResult<T> = std::result::Result<T, QualityError>;
