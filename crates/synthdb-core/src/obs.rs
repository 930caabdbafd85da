//! Structured observability hooks for pipeline lifecycle events.
//!
//! This module provides:
//! - dbid-scoped tracing spans (`db_span`, and the `DbSpan` RAII guard)
//! - one emission function per lifecycle event: partitioning, quality
//!   evaluation, augmentation start/attempt/finish, sandbox timeout
//!
//! Events are emitted at `info!` level (`warn!` for timeouts). Filter with
//! `RUST_LOG`; pass `--json` to the CLI for JSON lines.

use tracing::info;

/// Span tagging everything logged for one dbid. Attach it to futures with
/// `tracing::Instrument`.
pub fn db_span(dbid: &str) -> tracing::Span {
    tracing::info_span!("synthdb.db", dbid = %dbid)
}

/// RAII guard that enters [`db_span`] on the current thread, for synchronous
/// work such as a quality evaluation on a blocking thread.
///
/// ```ignore
/// let _span = DbSpan::enter("db_0007");
/// // every log line below carries dbid = "db_0007"
/// ```
pub struct DbSpan {
    _span: tracing::span::EnteredSpan,
}

impl DbSpan {
    pub fn enter(dbid: &str) -> Self {
        Self {
            _span: db_span(dbid).entered(),
        }
    }
}

/// Emit event: a partitioning run finished.
pub fn emit_partition_finished(vectors: usize, clusters: usize, incremental: bool) {
    info!(
        event = "partition.finished",
        vectors = vectors,
        clusters = clusters,
        incremental = incremental,
    );
}

/// Emit event: one database was evaluated by the quality gate.
pub fn emit_quality_evaluated(db: &str, findings: usize, failed: usize, ok: bool) {
    info!(
        event = "quality.evaluated",
        db = %db,
        findings = findings,
        failed = failed,
        ok = ok,
    );
}

/// Emit event: an augmentation loop started.
pub fn emit_augment_started(dbid: &str, max_iterations: u32) {
    info!(event = "augment.started", dbid = %dbid, max_iterations = max_iterations);
}

/// Emit event: one generate-execute-validate attempt completed.
pub fn emit_augment_attempt(dbid: &str, iteration: u32, outcome: &str, duration_ms: u64) {
    info!(
        event = "augment.attempt",
        dbid = %dbid,
        iteration = iteration,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: an augmentation loop reached a terminal state.
pub fn emit_augment_finished(dbid: &str, success: bool, iterations: u32, duration_ms: u64) {
    info!(
        event = "augment.finished",
        dbid = %dbid,
        success = success,
        iterations = iterations,
        duration_ms = duration_ms,
    );
}

/// Emit event: a sandboxed process group was killed on timeout (warning level).
pub fn emit_sandbox_timeout(pid: Option<u32>, timeout_ms: u64) {
    tracing::warn!(
        event = "sandbox.timeout",
        pid = pid.unwrap_or_default(),
        timeout_ms = timeout_ms,
    );
}
