//! Built-in rules.
//!
//! - [`basic`]    — row counts, null rates, foreign-key integrity
//! - [`schema`]   — key shapes, text widths, table relationships
//! - [`semantic`] — value formats on columns selected by name

pub mod basic;
pub mod schema;
pub mod semantic;

pub use basic::{ForeignKeyRule, NullRateRule, RowCountRule};
pub use schema::{
    CompositePrimaryKeyRule, IsolatedTableRule, MultipleFkReferenceRule, PrimaryKeyShapeRule,
    VarcharLengthRule,
};
pub use semantic::{ColumnMatcher, SemanticRule, ValueCheck};
