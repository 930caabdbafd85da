//! Error types for the sandbox module.

/// Errors produced by the sandbox layer.
///
/// A program that fails, prints the wrong thing or runs out of time is not an
/// error: those are reported through [`SandboxOutput`](super::SandboxOutput).
/// These variants cover the sandbox itself being unable to run anything.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to spawn interpreter {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect child output: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
