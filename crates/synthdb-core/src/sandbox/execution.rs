//! Process-group isolated execution with a hard wall-clock limit.
//!
//! The child is started as the leader of a fresh process group. On timeout the
//! whole group is sent `SIGKILL`, so descendants the program spawned go down
//! with it; the call does not wait for the program to cooperate.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use super::config::{EnvPolicy, SandboxConfig};
use super::error::{SandboxError, SandboxResult};
use crate::metrics::METRICS;
use crate::obs;

/// stderr reported for an execution that ran out of time.
pub const TIMEOUT_MESSAGE: &str = "Execution timeout";

/// What one execution produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxOutput {
    /// Captured stdout; absent when the run timed out.
    pub stdout: Option<String>,
    pub stderr: String,
    /// Exit code; absent on timeout or death by signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl SandboxOutput {
    /// The sentinel returned when the limit elapsed.
    pub fn timeout(duration_ms: u64) -> Self {
        Self {
            stdout: None,
            stderr: TIMEOUT_MESSAGE.to_string(),
            exit_code: None,
            timed_out: true,
            duration_ms,
        }
    }

    /// Exited on its own with status 0.
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs one untrusted program to completion or timeout.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(
        &self,
        program: &str,
        env_overrides: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> SandboxResult<SandboxOutput>;
}

/// [`Sandbox`] backed by an interpreter child process.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    interpreter: String,
    interpreter_args: Vec<String>,
    env_policy: EnvPolicy,
}

impl ProcessSandbox {
    pub fn new(interpreter: impl Into<String>, interpreter_args: Vec<String>, env_policy: EnvPolicy) -> Self {
        Self {
            interpreter: interpreter.into(),
            interpreter_args,
            env_policy,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> SandboxResult<Self> {
        config.validate()?;
        Ok(Self::new(
            config.interpreter.clone(),
            config.interpreter_args.clone(),
            config.env_policy(),
        ))
    }

    fn command(&self, program: &str, env_overrides: &BTreeMap<String, String>) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.interpreter_args)
            .arg(program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        if let EnvPolicy::AllowList(names) = &self.env_policy {
            cmd.env_clear();
            for name in names {
                if let Some(value) = std::env::var_os(name) {
                    cmd.env(name, value);
                }
            }
        }
        cmd.envs(env_overrides);
        cmd
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn execute(
        &self,
        program: &str,
        env_overrides: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> SandboxResult<SandboxOutput> {
        let start = Instant::now();
        let child = self
            .command(program, env_overrides)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;
        let pid = child.id();
        METRICS.inc_sandbox_executions();
        debug!(pid = pid.unwrap_or_default(), "sandbox child started");

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(SandboxOutput {
                    stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                    timed_out: false,
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
            Err(_elapsed) => {
                // The leader was already SIGKILLed when its future dropped;
                // the rest of the group goes here.
                kill_process_group(pid);
                METRICS.inc_sandbox_timeouts();
                obs::emit_sandbox_timeout(pid, timeout.as_millis() as u64);
                Ok(SandboxOutput::timeout(start.elapsed().as_millis() as u64))
            }
        }
    }
}

fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "failed to kill sandbox process group"),
    }
}
