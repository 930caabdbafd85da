//! Sandbox configuration and environment forwarding policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{SandboxError, SandboxResult};

/// Variables forwarded to the child when the environment is not inherited.
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "TMPDIR", "PYTHONPATH"];

/// Which parent environment variables reach the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvPolicy {
    /// Forward the whole parent environment.
    Inherit,
    /// Start from an empty environment and forward only these names.
    AllowList(Vec<String>),
}

impl Default for EnvPolicy {
    fn default() -> Self {
        EnvPolicy::AllowList(DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect())
    }
}

/// Configuration for sandboxed program execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter executable.
    pub interpreter: String,
    /// Arguments placed before the program text.
    pub interpreter_args: Vec<String>,
    /// Wall-clock limit for one execution (seconds).
    pub timeout_secs: u64,
    /// Forward the whole parent environment instead of `env_allowlist`.
    pub inherit_env: bool,
    pub env_allowlist: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            interpreter_args: vec!["-c".to_string()],
            timeout_secs: 300,
            inherit_env: false,
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SandboxConfig {
    pub fn validate(&self) -> SandboxResult<()> {
        if self.interpreter.trim().is_empty() {
            return Err(SandboxError::InvalidConfig(
                "interpreter must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(SandboxError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn env_policy(&self) -> EnvPolicy {
        if self.inherit_env {
            EnvPolicy::Inherit
        } else {
            EnvPolicy::AllowList(self.env_allowlist.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_config_default() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.interpreter, "python3");
        assert_eq!(cfg.interpreter_args, vec!["-c"]);
        assert_eq!(cfg.timeout(), Duration::from_secs(300));
        assert_eq!(cfg.env_policy(), EnvPolicy::default());
    }

    #[test]
    fn test_inherit_env_switches_policy() {
        let cfg = SandboxConfig {
            inherit_env: true,
            ..Default::default()
        };
        assert_eq!(cfg.env_policy(), EnvPolicy::Inherit);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cfg = SandboxConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(SandboxError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: SandboxConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.interpreter, "python3");
        assert!(!cfg.inherit_env);
    }
}
