//! Quality: rule-based validation of populated SQLite databases.
//!
//! # Modules
//!
//! - [`finding`]  — `Severity`, `Finding`, `QualityReport`
//! - [`catalog`]  — schema snapshot (`Catalog`, `TableInfo`, `ForeignKey`)
//! - [`rule`]     — `QualityRule` capability, `RuleContext`, `RuleSpec`, `RuleParams`
//! - [`registry`] — `RuleRegistry` (id → constructor)
//! - [`rules`]    — built-in rules
//! - [`gate`]     — `QualityGate`, `DatabaseValidator`, batch checks
//! - [`error`]    — `QualityError` / `QualityResult`

pub mod catalog;
pub mod error;
pub mod finding;
pub mod gate;
pub mod registry;
pub mod rule;
pub mod rules;

pub use catalog::{quote_ident, Catalog, ColumnInfo, ForeignKey, TableInfo};
pub use error::{QualityError, QualityResult};
pub use finding::{Finding, QualityReport, Severity, ENGINE_ERROR_RULE};
pub use gate::{check_databases, DatabaseCheck, DatabaseValidator, QualityGate};
pub use registry::{RuleFactory, RuleRegistry};
pub use rule::{QualityRule, RuleContext, RuleParams, RuleSpec};
