//! Row counts, null rates and foreign-key integrity.

use serde_json::json;

use crate::quality::catalog::quote_ident;
use crate::quality::error::QualityResult;
use crate::quality::finding::{Finding, Severity};
use crate::quality::rule::{QualityRule, RuleContext, RuleParams};

pub const ROW_COUNT: &str = "row_count";
pub const NULL_RATE: &str = "null_rate";
pub const FK_INTEGRITY: &str = "fk_integrity";

/// Every table must hold at least `min_records_per_table` rows.
#[derive(Debug, Clone)]
pub struct RowCountRule {
    pub min_records: u64,
}

impl RowCountRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["min_records_per_table"])?;
        Ok(Box::new(Self {
            min_records: params.u64_or("min_records_per_table", 20)?,
        }))
    }
}

impl QualityRule for RowCountRule {
    fn id(&self) -> &str {
        ROW_COUNT
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        Ok(ctx
            .catalog
            .tables
            .iter()
            .map(|t| {
                Finding::check(
                    ROW_COUNT,
                    t.row_count >= self.min_records,
                    Severity::Error,
                    format!("{} has {} rows (min={})", t.name, t.row_count, self.min_records),
                )
                .table(&t.name)
                .detail("count", t.row_count)
                .detail("min", self.min_records)
            })
            .collect())
    }
}

/// Per column, the share of NULL or empty-string values must not exceed
/// `max_null_rate`. Empty tables report a rate of 0.
#[derive(Debug, Clone)]
pub struct NullRateRule {
    pub max_null_rate: f64,
}

impl NullRateRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["max_null_rate"])?;
        let max_null_rate = params.f64_or("max_null_rate", 0.3)?;
        if max_null_rate < 0.0 {
            return Err(params.invalid("max_null_rate", "must not be negative"));
        }
        Ok(Box::new(Self { max_null_rate }))
    }
}

impl QualityRule for NullRateRule {
    fn id(&self) -> &str {
        NULL_RATE
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for table in &ctx.catalog.tables {
            for column in &table.columns {
                let col = quote_ident(&column.name);
                let nulls: i64 = ctx.conn.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM {} WHERE {col} IS NULL OR {col} = ''",
                        quote_ident(&table.name)
                    ),
                    [],
                    |row| row.get(0),
                )?;
                let total = table.row_count;
                let rate = if total == 0 {
                    0.0
                } else {
                    nulls as f64 / total as f64
                };
                findings.push(
                    Finding::check(
                        NULL_RATE,
                        rate <= self.max_null_rate,
                        Severity::Warn,
                        format!(
                            "{}.{} null rate {:.3} (max={})",
                            table.name, column.name, rate, self.max_null_rate
                        ),
                    )
                    .table(&table.name)
                    .column(&column.name)
                    .detail("total", total)
                    .detail("nulls", nulls)
                    .detail("rate", rate),
                );
            }
        }
        Ok(findings)
    }
}

/// Every non-null referencing tuple must match a row in the referenced table.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyRule;

impl ForeignKeyRule {
    pub fn from_params(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[])?;
        Ok(Box::new(Self))
    }
}

impl QualityRule for ForeignKeyRule {
    fn id(&self) -> &str {
        FK_INTEGRITY
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for table in &ctx.catalog.tables {
            for fk in &table.foreign_keys {
                let referenced = ctx.catalog.require(&fk.referenced_table)?;
                let targets = ctx.catalog.resolve_targets(fk)?;

                let join = fk
                    .from_columns
                    .iter()
                    .zip(&targets)
                    .map(|(from, to)| format!("a.{} = b.{}", quote_ident(from), quote_ident(to)))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let present = fk
                    .from_columns
                    .iter()
                    .map(|from| format!("a.{} IS NOT NULL", quote_ident(from)))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let sql = format!(
                    "SELECT COUNT(*) FROM {} AS a LEFT JOIN {} AS b ON {join} \
                     WHERE {present} AND b.{} IS NULL",
                    quote_ident(&table.name),
                    quote_ident(&referenced.name),
                    quote_ident(&targets[0]),
                );
                let violations: i64 = ctx.conn.query_row(&sql, [], |row| row.get(0))?;

                let from = fk.from_columns.join(",");
                let to = targets.join(",");
                findings.push(
                    Finding::check(
                        FK_INTEGRITY,
                        violations == 0,
                        Severity::Error,
                        format!(
                            "{}.{} -> {}.{} broken={}",
                            table.name, from, referenced.name, to, violations
                        ),
                    )
                    .table(&table.name)
                    .column(from)
                    .detail("violations", violations)
                    .detail("references", json!(format!("{}({})", referenced.name, to))),
                );
            }
        }
        Ok(findings)
    }
}
