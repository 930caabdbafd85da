//! Observability tests for synthdb lifecycle tracing.
//!
//! Structured events are emitted with an `event` field naming the lifecycle
//! step; these tests check that the real code paths emit them.

use std::path::Path;

use rusqlite::Connection;
use synthdb_core::quality::{QualityGate, RuleRegistry, RuleSpec};
use synthdb_core::{
    emit_augment_attempt, emit_augment_finished, emit_augment_started,
    emit_quality_evaluated, emit_sandbox_timeout, ClusterPartitioner, DbSpan, EmbeddingSet,
    PartitionConfig,
};
use tracing_test::traced_test;

// ---------------------------------------------------------------------------
// Emitters
// ---------------------------------------------------------------------------

#[traced_test]
#[test]
fn test_augment_lifecycle_events() {
    emit_augment_started("db_0001", 20);
    emit_augment_attempt("db_0001", 1, "runtime_error", 812);
    emit_augment_finished("db_0001", false, 20, 91_000);

    assert!(logs_contain("augment.started"));
    assert!(logs_contain("runtime_error"));
    assert!(logs_contain("augment.finished"));
}

#[traced_test]
#[test]
fn test_sandbox_timeout_is_logged() {
    emit_sandbox_timeout(Some(4242), 300_000);
    assert!(logs_contain("sandbox.timeout"));
    assert!(logs_contain("WARN"));
}

#[traced_test]
#[test]
fn test_db_span_tags_nested_events() {
    let span = DbSpan::enter("db_span_check");
    emit_quality_evaluated("inner.sqlite", 3, 0, true);
    drop(span);
    assert!(logs_contain("db_span_check"));
}

// ---------------------------------------------------------------------------
// Emitted from real code paths
// ---------------------------------------------------------------------------

#[traced_test]
#[test]
fn test_partition_run_emits_finished_event() {
    let set = EmbeddingSet::new(
        vec!["a".into(), "b".into(), "c".into()],
        vec![vec![0.0], vec![1.0], vec![5.0]],
    )
    .unwrap();
    ClusterPartitioner::new(PartitionConfig::default())
        .unwrap()
        .run(&set, None)
        .unwrap();
    assert!(logs_contain("partition.finished"));
}

#[traced_test]
#[test]
fn test_gate_evaluation_emits_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obs.sqlite");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
        .unwrap();

    let gate = QualityGate::new(&RuleRegistry::builtin(), &[RuleSpec::new("row_count")]).unwrap();
    gate.evaluate(Path::new(&path));
    assert!(logs_contain("quality.evaluated"));
}
