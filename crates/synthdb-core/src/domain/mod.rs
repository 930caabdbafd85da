//! Shared domain plumbing: the crate-wide error type and artifact digests.

pub mod digest;
pub mod error;

pub use digest::{read_json_artifact, write_json_artifact, ArtifactDigest};
pub use error::{ConfigError, Result, SynthError};
