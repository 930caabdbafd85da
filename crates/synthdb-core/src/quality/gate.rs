//! Quality gate: runs an ordered rule set against one SQLite database and
//! aggregates the findings into a [`QualityReport`].
//!
//! Evaluation never fails. A rule error stops the pass, keeps the findings
//! gathered so far and appends a single `engine_error` finding, which makes the
//! report not ok.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::Catalog;
use super::error::QualityResult;
use super::finding::{Finding, QualityReport};
use super::registry::RuleRegistry;
use super::rule::{QualityRule, RuleContext, RuleSpec};
use crate::metrics::METRICS;
use crate::obs;

// ---------------------------------------------------------------------------
// Validator seam
// ---------------------------------------------------------------------------

/// Anything that can judge a populated database.
///
/// The augmentation loop depends on this rather than on [`QualityGate`] so
/// tests can substitute a fixed verdict.
pub trait DatabaseValidator: Send + Sync {
    fn validate(&self, db_path: &Path) -> QualityReport;
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

pub struct QualityGate {
    rules: Vec<Box<dyn QualityRule>>,
}

impl std::fmt::Debug for QualityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGate")
            .field("rules", &self.rule_ids())
            .finish()
    }
}

impl QualityGate {
    /// Build a gate from explicit rule specs, resolving every id against
    /// `registry`. Unknown ids and bad parameters fail here.
    pub fn new(registry: &RuleRegistry, specs: &[RuleSpec]) -> QualityResult<Self> {
        let rules = specs
            .iter()
            .map(|spec| registry.build(spec))
            .collect::<QualityResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Build from optional configuration; `None` selects [`RuleSpec::defaults`].
    pub fn from_specs(registry: &RuleRegistry, specs: Option<&[RuleSpec]>) -> QualityResult<Self> {
        match specs {
            Some(specs) => Self::new(registry, specs),
            None => Self::new(registry, &RuleSpec::defaults()),
        }
    }

    /// The default rule set over the built-in registry.
    pub fn with_defaults() -> QualityResult<Self> {
        Self::from_specs(&RuleRegistry::builtin(), None)
    }

    pub fn from_rules(rules: Vec<Box<dyn QualityRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Evaluate every rule, in order, against the database at `db_path`.
    ///
    /// The database is opened read-only, so repeated evaluations of an
    /// unchanged file produce identical reports.
    pub fn evaluate(&self, db_path: &Path) -> QualityReport {
        let mut findings = Vec::new();
        if let Err(e) = self.run_rules(db_path, &mut findings) {
            warn!(db = %db_path.display(), error = %e, "quality evaluation aborted");
            findings.push(Finding::engine_error(e.to_string()));
        }

        let report = QualityReport::new(findings);
        METRICS.inc_quality_evaluations();
        obs::emit_quality_evaluated(
            &db_path.display().to_string(),
            report.len(),
            report.failures().count(),
            report.ok(),
        );
        report
    }

    fn run_rules(&self, db_path: &Path, findings: &mut Vec<Finding>) -> QualityResult<()> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let catalog = Catalog::load(&conn)?;
        let ctx = RuleContext {
            conn: &conn,
            catalog: &catalog,
        };

        for rule in &self.rules {
            let produced = rule.run(&ctx)?;
            debug!(rule = rule.id(), findings = produced.len(), "rule finished");
            findings.extend(produced);
        }
        Ok(())
    }
}

impl DatabaseValidator for QualityGate {
    fn validate(&self, db_path: &Path) -> QualityReport {
        self.evaluate(db_path)
    }
}

// ---------------------------------------------------------------------------
// Batch check
// ---------------------------------------------------------------------------

/// Verdict for one database in a batch check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseCheck {
    pub ok: bool,
    pub report: QualityReport,
}

/// Evaluate each database in turn, keyed by its path as given.
pub fn check_databases<P: AsRef<Path>>(
    gate: &QualityGate,
    paths: &[P],
) -> BTreeMap<String, DatabaseCheck> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            let report = gate.evaluate(path);
            (
                path.display().to_string(),
                DatabaseCheck {
                    ok: report.ok(),
                    report,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::error::QualityError;
    use crate::quality::finding::{Severity, ENGINE_ERROR_RULE};

    struct Fixed(bool);

    impl QualityRule for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }

        fn run(&self, _ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
            Ok(vec![Finding::check("fixed", self.0, Severity::Error, "fixed")])
        }
    }

    struct Broken;

    impl QualityRule for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn run(&self, _ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
            Err(QualityError::MissingTable("nowhere".into()))
        }
    }

    fn empty_db(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("t.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .unwrap();
        path
    }

    #[test]
    fn test_unknown_rule_fails_construction() {
        let err = QualityGate::new(&RuleRegistry::builtin(), &[RuleSpec::new("nope")]).unwrap_err();
        assert!(matches!(err, QualityError::UnknownRule(_)));
    }

    #[test]
    fn test_default_rules() {
        let gate = QualityGate::with_defaults().unwrap();
        assert_eq!(gate.rule_ids(), vec!["row_count", "null_rate", "fk_integrity"]);
    }

    #[test]
    fn test_rule_error_keeps_prior_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(&dir);
        let gate = QualityGate::from_rules(vec![
            Box::new(Fixed(true)),
            Box::new(Broken),
            Box::new(Fixed(true)),
        ]);
        let report = gate.evaluate(&path);
        assert_eq!(report.len(), 2);
        assert_eq!(report.findings[0].rule_id, "fixed");
        assert_eq!(report.findings[1].rule_id, ENGINE_ERROR_RULE);
        assert!(!report.ok());
    }

    #[test]
    fn test_missing_database_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let gate = QualityGate::from_rules(vec![Box::new(Fixed(true))]);
        let report = gate.evaluate(&dir.path().join("absent.sqlite"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings[0].rule_id, ENGINE_ERROR_RULE);
        assert!(!dir.path().join("absent.sqlite").exists());
    }

    #[test]
    fn test_check_databases_keys_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = empty_db(&dir);
        let gate = QualityGate::from_rules(vec![Box::new(Fixed(false))]);
        let checks = check_databases(&gate, &[&path]);
        let check = &checks[&path.display().to_string()];
        assert!(!check.ok);
        assert_eq!(check.report.len(), 1);
    }
}
