//! Quality gate evaluation over real SQLite files.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use synthdb_core::quality::{
    check_databases, QualityError, QualityGate, RuleRegistry, RuleSpec, Severity,
    ENGINE_ERROR_RULE,
};

fn users_db(dir: &Path, name: &str, rows: usize) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);")
        .unwrap();
    for i in 0..rows {
        conn.execute(
            "INSERT INTO users (id, email) VALUES (?1, ?2)",
            rusqlite::params![i as i64 + 1, format!("user{i}@example.com")],
        )
        .unwrap();
    }
    path
}

fn row_count_gate(min: u64) -> QualityGate {
    QualityGate::new(
        &RuleRegistry::builtin(),
        &[RuleSpec::new("row_count").with_param("min_records_per_table", min)],
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Row count
// ---------------------------------------------------------------------------

#[test]
fn test_row_count_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let gate = row_count_gate(20);

    let small = gate.evaluate(&users_db(dir.path(), "small.sqlite", 15));
    assert!(!small.ok());
    let failing: Vec<_> = small.failures().collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].table.as_deref(), Some("users"));
    assert_eq!(failing[0].severity, Severity::Error);
    assert_eq!(failing[0].details["count"], 15);

    let large = gate.evaluate(&users_db(dir.path(), "large.sqlite", 25));
    assert!(large.ok());
}

#[test]
fn test_evaluation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db = users_db(dir.path(), "u.sqlite", 5);
    let gate = QualityGate::with_defaults().unwrap();
    assert_eq!(gate.evaluate(&db), gate.evaluate(&db));
}

// ---------------------------------------------------------------------------
// Referential integrity
// ---------------------------------------------------------------------------

#[test]
fn test_single_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fk.sqlite");
    Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));
             INSERT INTO users (id) VALUES (1), (2);
             INSERT INTO orders (id, user_id) VALUES (1, 1), (2, 2), (3, 99), (4, NULL);",
        )
        .unwrap();

    let gate = QualityGate::new(&RuleRegistry::builtin(), &[RuleSpec::new("fk_integrity")]).unwrap();
    let report = gate.evaluate(&path);
    assert!(!report.ok());
    let violation = report.failures().next().unwrap();
    assert_eq!(violation.rule_id, "fk_integrity");
    assert_eq!(violation.table.as_deref(), Some("orders"));
    assert_eq!(violation.details["violations"], 1);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_corrupt_database_is_engine_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.sqlite");
    std::fs::write(&path, b"this is not a sqlite database, not even close........").unwrap();

    let report = row_count_gate(1).evaluate(&path);
    assert!(!report.ok());
    assert_eq!(report.len(), 1);
    assert_eq!(report.findings[0].rule_id, ENGINE_ERROR_RULE);
}

#[test]
fn test_missing_database_is_engine_error() {
    let dir = tempfile::tempdir().unwrap();
    let report = row_count_gate(1).evaluate(&dir.path().join("absent.sqlite"));
    assert!(!report.ok());
    assert_eq!(report.findings[0].rule_id, ENGINE_ERROR_RULE);
    // Read-only evaluation must not create the file.
    assert!(!dir.path().join("absent.sqlite").exists());
}

#[test]
fn test_unknown_rule_rejected_at_construction() {
    let err = QualityGate::new(&RuleRegistry::builtin(), &[RuleSpec::new("no_such_rule")])
        .unwrap_err();
    assert!(matches!(err, QualityError::UnknownRule(id) if id == "no_such_rule"));
}

// ---------------------------------------------------------------------------
// Batch check
// ---------------------------------------------------------------------------

#[test]
fn test_check_databases_keys_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let good = users_db(dir.path(), "good.sqlite", 30);
    let bad = users_db(dir.path(), "bad.sqlite", 3);

    let checks = check_databases(&QualityGate::with_defaults().unwrap(), &[&good, &bad]);
    assert_eq!(checks.len(), 2);
    assert!(checks[&good.display().to_string()].ok);
    assert!(!checks[&bad.display().to_string()].ok);
}
