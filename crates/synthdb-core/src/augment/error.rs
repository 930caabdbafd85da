//! Error types for the augment module.

use std::path::PathBuf;

use crate::sandbox::SandboxError;

/// Infrastructure failures of an augmentation run.
///
/// Anything the generated program does wrong is an attempt outcome, not an
/// error. These variants mean the loop could not run at all.
#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    #[error("template database not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("failed to prepare working copy {}: {source}", .path.display())]
    WorkingCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read schema: {0}")]
    Schema(#[from] rusqlite::Error),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("invalid augment configuration: {0}")]
    InvalidConfig(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The loop stopped mid-run; `last_code` is the program it was holding.
    #[error("augmentation interrupted: {source}")]
    Interrupted {
        last_code: String,
        #[source]
        source: Box<AugmentError>,
    },
}

impl AugmentError {
    /// Attach the code the loop held when this error stopped it.
    pub fn interrupted(self, code: &str) -> Self {
        if matches!(self, AugmentError::Interrupted { .. }) {
            return self;
        }
        AugmentError::Interrupted {
            last_code: code.to_string(),
            source: Box::new(self),
        }
    }

    /// Last generated program, when the error happened after generation began.
    pub fn last_code(&self) -> Option<&str> {
        match self {
            AugmentError::Interrupted { last_code, .. } => Some(last_code),
            _ => None,
        }
    }
}

/// Result type for augment operations.
pub type AugmentResult<T> = std::result::Result<T, AugmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_keeps_code_and_cause() {
        let err = AugmentError::InvalidConfig("boom".into()).interrupted("print(1)");
        assert_eq!(err.last_code(), Some("print(1)"));
        assert!(err.to_string().contains("boom"));

        // Re-wrapping keeps the innermost code.
        let again = err.interrupted("print(2)");
        assert_eq!(again.last_code(), Some("print(1)"));
        assert_eq!(AugmentError::Manifest("x".into()).last_code(), None);
    }
}
