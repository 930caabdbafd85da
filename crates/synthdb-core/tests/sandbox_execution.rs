//! End-to-end process-group tests for the sandbox module.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use synthdb_core::sandbox::{EnvPolicy, ProcessSandbox, Sandbox, SandboxConfig, TIMEOUT_MESSAGE};

fn sh() -> ProcessSandbox {
    ProcessSandbox::new("/bin/sh", vec!["-c".to_string()], EnvPolicy::Inherit)
}

/// Alive means present in /proc and not a zombie.
fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map(|state| state != "Z" && state != "X")
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn wait_until_dead(pid: u32, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    !process_alive(pid)
}

fn read_pid(path: &Path) -> u32 {
    std::fs::read_to_string(path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

// -------------------------------------------------------------------------
// Timeout enforcement
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_sleeping_child_is_killed_at_timeout() {
    let started = Instant::now();
    let out = sh()
        .execute("sleep 30", &BTreeMap::new(), Duration::from_millis(300))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(out.timed_out);
    assert!(out.stdout.is_none());
    assert_eq!(out.stderr, TIMEOUT_MESSAGE);
    assert_eq!(out.exit_code, None);
}

#[tokio::test]
async fn test_timeout_kills_descendants() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let mut env = BTreeMap::new();
    env.insert("PID_FILE".to_string(), pid_file.display().to_string());

    // The background sleep holds stdout open and ignores the shell's fate.
    let out = sh()
        .execute(
            "sleep 60 & echo $! > \"$PID_FILE\"; wait",
            &env,
            Duration::from_millis(500),
        )
        .await
        .unwrap();
    assert!(out.timed_out);

    let grandchild = read_pid(&pid_file);
    assert!(
        wait_until_dead(grandchild, Duration::from_secs(5)).await,
        "descendant {grandchild} survived the timeout"
    );
}

#[tokio::test]
async fn test_trapped_sigterm_does_not_prevent_kill() {
    let started = Instant::now();
    let out = sh()
        .execute(
            "trap '' TERM INT; while :; do sleep 1; done",
            &BTreeMap::new(),
            Duration::from_millis(300),
        )
        .await
        .unwrap();
    assert!(out.timed_out);
    assert!(started.elapsed() < Duration::from_secs(5));
}

// -------------------------------------------------------------------------
// Normal completion
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_fast_program_is_not_timed_out() {
    let out = sh()
        .execute("printf True", &BTreeMap::new(), Duration::from_secs(10))
        .await
        .unwrap();
    assert!(!out.timed_out);
    assert_eq!(out.stdout.as_deref(), Some("True"));
    assert_eq!(out.exit_code, Some(0));
}

#[tokio::test]
async fn test_from_config_with_allowlist() {
    std::env::set_var("SYNTHDB_SANDBOX_VISIBLE", "yes");
    std::env::set_var("SYNTHDB_SANDBOX_HIDDEN", "secret");
    let config = SandboxConfig {
        interpreter: "/bin/sh".to_string(),
        interpreter_args: vec!["-c".to_string()],
        timeout_secs: 10,
        inherit_env: false,
        env_allowlist: vec!["SYNTHDB_SANDBOX_VISIBLE".to_string()],
    };
    let sandbox = ProcessSandbox::from_config(&config).unwrap();
    let out = sandbox
        .execute(
            "printf '%s/%s' \"$SYNTHDB_SANDBOX_VISIBLE\" \"$SYNTHDB_SANDBOX_HIDDEN\"",
            &BTreeMap::new(),
            config.timeout(),
        )
        .await
        .unwrap();
    assert_eq!(out.stdout.as_deref(), Some("yes/"));
}
