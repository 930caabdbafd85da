//! The rule capability and its configuration.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::Catalog;
use super::error::{QualityError, QualityResult};
use super::finding::Finding;

/// What a rule sees while it runs: a read-only connection and the schema
/// snapshot taken at the start of the evaluation.
pub struct RuleContext<'a> {
    pub conn: &'a Connection,
    pub catalog: &'a Catalog,
}

/// A named quality check over one database.
///
/// Rules only read. An `Err` aborts the evaluation and is recorded as an
/// `engine_error` finding.
pub trait QualityRule: Send + Sync {
    fn id(&self) -> &str;

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>>;
}

/// A configured rule: registry id plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(alias = "module")]
    pub rule: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RuleSpec {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// The rule set used when none is configured.
    pub fn defaults() -> Vec<RuleSpec> {
        vec![
            RuleSpec::new("row_count").with_param("min_records_per_table", 20),
            RuleSpec::new("null_rate").with_param("max_null_rate", 1.0),
            RuleSpec::new("fk_integrity"),
        ]
    }
}

/// Typed access to a rule's parameter map.
pub struct RuleParams<'a> {
    rule: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> RuleParams<'a> {
    pub fn new(rule: &'a str, map: &'a Map<String, Value>) -> Self {
        Self { rule, map }
    }

    pub fn rule(&self) -> &str {
        self.rule
    }

    /// Fail on any key outside `known`.
    pub fn deny_unknown(&self, known: &[&str]) -> QualityResult<()> {
        match self.map.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(self.invalid(key, "unknown parameter")),
            None => Ok(()),
        }
    }

    pub fn u64_or(&self, key: &str, default: u64) -> QualityResult<u64> {
        match self.map.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .ok_or_else(|| self.invalid(key, "expected a non-negative integer")),
        }
    }

    pub fn f64_or(&self, key: &str, default: f64) -> QualityResult<f64> {
        match self.map.get(key) {
            None => Ok(default),
            Some(v) => match v.as_f64() {
                Some(x) if x.is_finite() => Ok(x),
                _ => Err(self.invalid(key, "expected a finite number")),
            },
        }
    }

    pub fn str_or(&self, key: &str, default: &str) -> QualityResult<String> {
        match self.map.get(key) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(key, "expected a string")),
        }
    }

    pub fn strings_or(&self, key: &str, default: &[&str]) -> QualityResult<Vec<String>> {
        match self.map.get(key) {
            None => Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(key, "expected a list of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(key, "expected a list of strings")),
        }
    }

    pub fn invalid(&self, key: &str, reason: &str) -> QualityError {
        QualityError::InvalidParam {
            rule: self.rule.to_string(),
            param: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
