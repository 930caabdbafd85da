//! Structural checks over declared schema: key shapes, text widths and how
//! tables relate to one another.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::quality::catalog::{Catalog, TableInfo};
use crate::quality::error::QualityResult;
use crate::quality::finding::{Finding, Severity};
use crate::quality::rule::{QualityRule, RuleContext, RuleParams};

pub const VARCHAR_LENGTH: &str = "varchar_length";
pub const PRIMARY_KEY_SHAPE: &str = "primary_key_shape";
pub const COMPOSITE_PRIMARY_KEY: &str = "composite_primary_key";
pub const ISOLATED_TABLE: &str = "isolated_table";
pub const MULTIPLE_FK_REFERENCE: &str = "multiple_fk_reference";

/// SQLite type affinity rule 1: a declared type containing "INT".
fn is_integer_type(declared: &str) -> bool {
    declared.to_ascii_uppercase().contains("INT")
}

/// Length-bounded text columns must allow at least `min_length` characters.
#[derive(Debug, Clone)]
pub struct VarcharLengthRule {
    pub min_length: u64,
    pattern: Regex,
}

impl VarcharLengthRule {
    pub fn new(min_length: u64) -> Self {
        Self {
            min_length,
            pattern: Regex::new(
                r"(?i)^\s*(?:national\s+)?(?:n?varchar|character\s+varying|varying\s+character|n?char)\s*\(\s*(\d+)\s*\)",
            )
            .expect("static pattern"),
        }
    }

    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["min_length"])?;
        Ok(Box::new(Self::new(params.u64_or("min_length", 32)?)))
    }

    fn declared_length(&self, declared: &str) -> Option<u64> {
        self.pattern
            .captures(declared)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl QualityRule for VarcharLengthRule {
    fn id(&self) -> &str {
        VARCHAR_LENGTH
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for table in &ctx.catalog.tables {
            for column in &table.columns {
                let Some(length) = self.declared_length(&column.declared_type) else {
                    continue;
                };
                findings.push(
                    Finding::check(
                        VARCHAR_LENGTH,
                        length >= self.min_length,
                        Severity::Warn,
                        format!(
                            "{}.{} declared {} (min length {})",
                            table.name, column.name, column.declared_type, self.min_length
                        ),
                    )
                    .table(&table.name)
                    .column(&column.name)
                    .detail("length", length)
                    .detail("min_length", self.min_length),
                );
            }
        }
        Ok(findings)
    }
}

/// Every table should have a single-column integer primary key.
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyShapeRule;

impl PrimaryKeyShapeRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[])?;
        Ok(Box::new(Self))
    }
}

impl QualityRule for PrimaryKeyShapeRule {
    fn id(&self) -> &str {
        PRIMARY_KEY_SHAPE
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        Ok(ctx
            .catalog
            .tables
            .iter()
            .map(|table| {
                let pk = table.primary_key();
                let (passed, message) = match pk.as_slice() {
                    [] => (false, format!("{} has no primary key", table.name)),
                    [col] if is_integer_type(&col.declared_type) => (
                        true,
                        format!("{} primary key {} is an integer", table.name, col.name),
                    ),
                    [col] => (
                        false,
                        format!(
                            "{} primary key {} is {}, expected an integer",
                            table.name, col.name, col.declared_type
                        ),
                    ),
                    _ => (
                        false,
                        format!("{} primary key spans {} columns", table.name, pk.len()),
                    ),
                };
                Finding::check(PRIMARY_KEY_SHAPE, passed, Severity::Error, message)
                    .table(&table.name)
                    .detail("pk_columns", pk_names(table))
            })
            .collect())
    }
}

/// Flags tables whose primary key is composite or missing.
#[derive(Debug, Clone, Default)]
pub struct CompositePrimaryKeyRule;

impl CompositePrimaryKeyRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[])?;
        Ok(Box::new(Self))
    }
}

impl QualityRule for CompositePrimaryKeyRule {
    fn id(&self) -> &str {
        COMPOSITE_PRIMARY_KEY
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        Ok(ctx
            .catalog
            .tables
            .iter()
            .map(|table| {
                let width = table.primary_key().len();
                let message = match width {
                    0 => format!("{} has no primary key", table.name),
                    1 => format!("{} has a single-column primary key", table.name),
                    n => format!("{} has a composite primary key over {n} columns", table.name),
                };
                Finding::check(COMPOSITE_PRIMARY_KEY, width == 1, Severity::Error, message)
                    .table(&table.name)
                    .detail("pk_columns", pk_names(table))
            })
            .collect())
    }
}

fn pk_names(table: &TableInfo) -> Vec<String> {
    table
        .primary_key()
        .into_iter()
        .map(|c| c.name.clone())
        .collect()
}

/// Tables that neither reference nor are referenced by another table.
#[derive(Debug, Clone, Default)]
pub struct IsolatedTableRule;

impl IsolatedTableRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[])?;
        Ok(Box::new(Self))
    }

    fn connected(catalog: &Catalog) -> BTreeSet<String> {
        let mut connected = BTreeSet::new();
        for table in &catalog.tables {
            for fk in &table.foreign_keys {
                let target = catalog
                    .table(&fk.referenced_table)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| fk.referenced_table.clone());
                if target != table.name {
                    connected.insert(table.name.clone());
                    connected.insert(target);
                }
            }
        }
        connected
    }
}

impl QualityRule for IsolatedTableRule {
    fn id(&self) -> &str {
        ISOLATED_TABLE
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        // A single table has nothing to relate to.
        if ctx.catalog.tables.len() < 2 {
            return Ok(vec![Finding::check(
                ISOLATED_TABLE,
                true,
                Severity::Warn,
                "fewer than two tables",
            )]);
        }

        let connected = Self::connected(ctx.catalog);
        let findings: Vec<Finding> = ctx
            .catalog
            .tables
            .iter()
            .filter(|t| !connected.contains(&t.name))
            .map(|t| {
                Finding::check(
                    ISOLATED_TABLE,
                    false,
                    Severity::Warn,
                    format!("{} has no foreign-key relationship to any other table", t.name),
                )
                .table(&t.name)
            })
            .collect();

        if findings.is_empty() {
            return Ok(vec![Finding::check(
                ISOLATED_TABLE,
                true,
                Severity::Warn,
                "every table participates in a foreign-key relationship",
            )]);
        }
        Ok(findings)
    }
}

/// A table should reference any other table through at most one foreign key.
#[derive(Debug, Clone, Default)]
pub struct MultipleFkReferenceRule;

impl MultipleFkReferenceRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[])?;
        Ok(Box::new(Self))
    }
}

impl QualityRule for MultipleFkReferenceRule {
    fn id(&self) -> &str {
        MULTIPLE_FK_REFERENCE
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for table in &ctx.catalog.tables {
            let mut by_target: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for fk in &table.foreign_keys {
                by_target
                    .entry(fk.referenced_table.to_ascii_lowercase())
                    .or_default()
                    .push(fk.from_columns.join(","));
            }
            for (target, columns) in by_target.into_iter().filter(|(_, c)| c.len() > 1) {
                findings.push(
                    Finding::check(
                        MULTIPLE_FK_REFERENCE,
                        false,
                        Severity::Error,
                        format!(
                            "{} references {} through {} foreign keys",
                            table.name,
                            target,
                            columns.len()
                        ),
                    )
                    .table(&table.name)
                    .detail("referenced_table", target)
                    .detail("count", columns.len())
                    .detail("columns", columns),
                );
            }
        }

        if findings.is_empty() {
            findings.push(Finding::check(
                MULTIPLE_FK_REFERENCE,
                true,
                Severity::Error,
                "no table references another through more than one foreign key",
            ));
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn run(rule: &dyn QualityRule, sql: &str) -> Vec<Finding> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        let catalog = Catalog::load(&conn).unwrap();
        rule.run(&RuleContext {
            conn: &conn,
            catalog: &catalog,
        })
        .unwrap()
    }

    #[test]
    fn test_varchar_length() {
        let findings = run(
            &VarcharLengthRule::new(32),
            "CREATE TABLE t (a VARCHAR(10), b varchar( 64 ), c TEXT, d INTEGER);",
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].column.as_deref(), Some("a"));
        assert!(!findings[0].passed);
        assert!(findings[1].passed);
    }

    #[test]
    fn test_primary_key_shape() {
        let findings = run(
            &PrimaryKeyShapeRule,
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (code TEXT PRIMARY KEY);
             CREATE TABLE c (x INTEGER, y INTEGER, PRIMARY KEY (x, y));
             CREATE TABLE d (x INTEGER);",
        );
        let passed: Vec<bool> = findings.iter().map(|f| f.passed).collect();
        assert_eq!(passed, vec![true, false, false, false]);
    }

    #[test]
    fn test_composite_primary_key() {
        let findings = run(
            &CompositePrimaryKeyRule,
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (x INTEGER, y INTEGER, PRIMARY KEY (x, y));",
        );
        assert!(findings[0].passed);
        assert!(findings[1].is_blocking());
        assert_eq!(findings[1].details["pk_columns"], serde_json::json!(["x", "y"]));
    }

    #[test]
    fn test_isolated_table() {
        let findings = run(
            &IsolatedTableRule,
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id));
             CREATE TABLE lonely (id INTEGER PRIMARY KEY, parent INTEGER REFERENCES lonely(id));",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].table.as_deref(), Some("lonely"));
        assert_eq!(findings[0].severity, Severity::Warn);
    }

    #[test]
    fn test_isolated_table_all_connected() {
        let findings = run(
            &IsolatedTableRule,
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id));",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].passed);
        assert!(findings[0].table.is_none());
    }

    #[test]
    fn test_multiple_fk_reference() {
        let findings = run(
            &MultipleFkReferenceRule,
            "CREATE TABLE users (id INTEGER PRIMARY KEY);
             CREATE TABLE transfers (
                 id INTEGER PRIMARY KEY,
                 sender INTEGER REFERENCES users(id),
                 receiver INTEGER REFERENCES users(id)
             );",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_blocking());
        assert_eq!(findings[0].details["count"], 2);
    }

    #[test]
    fn test_multiple_fk_reference_passes_once() {
        let findings = run(
            &MultipleFkReferenceRule,
            "CREATE TABLE users (id INTEGER PRIMARY KEY);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
        );
        assert_eq!(findings.len(), 1);
        assert!(findings[0].passed);
    }
}
