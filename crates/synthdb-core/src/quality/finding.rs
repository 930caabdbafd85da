//! Findings and the report they aggregate into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rule id used for the synthetic finding that records an evaluation failure.
pub const ENGINE_ERROR_RULE: &str = "engine_error";

/// Finding severity. Only `Error` findings decide whether a report is ok.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One rule's verdict on one table, column, or relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    /// A check result. Passing checks are reported at `Info`; failing ones at
    /// `failing_severity`.
    pub fn check(
        rule_id: &str,
        passed: bool,
        failing_severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            table: None,
            column: None,
            passed,
            severity: if passed {
                Severity::Info
            } else {
                failing_severity
            },
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// The synthetic finding recorded when evaluation itself fails.
    pub fn engine_error(message: impl Into<String>) -> Self {
        Self::check(ENGINE_ERROR_RULE, false, Severity::Error, message)
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// A failed finding at `Error` severity.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error && !self.passed
    }
}

/// Ordered findings from one gate evaluation.
///
/// Serializes as a bare JSON array of findings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityReport {
    pub findings: Vec<Finding>,
}

impl QualityReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    /// `true` iff no error-severity finding failed.
    pub fn ok(&self) -> bool {
        !self.findings.iter().any(Finding::is_blocking)
    }

    /// Failed findings at any severity.
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_blocking())
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Pretty JSON, as embedded into repair prompts.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string())
    }
}
