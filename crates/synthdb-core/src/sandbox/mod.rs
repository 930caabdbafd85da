//! Sandbox: isolated execution of untrusted generated programs.
//!
//! Each program runs as the leader of its own process group with a filtered
//! environment, and the whole group is killed when the wall-clock limit
//! elapses.
//!
//! # Modules
//!
//! - [`config`]    — `SandboxConfig`, `EnvPolicy`
//! - [`execution`] — `Sandbox` trait, `ProcessSandbox`, `SandboxOutput`
//! - [`error`]     — `SandboxError` / `SandboxResult`

pub mod config;
pub mod error;
pub mod execution;

pub use config::{EnvPolicy, SandboxConfig, DEFAULT_ENV_ALLOWLIST};
pub use error::{SandboxError, SandboxResult};
pub use execution::{ProcessSandbox, Sandbox, SandboxOutput, TIMEOUT_MESSAGE};
