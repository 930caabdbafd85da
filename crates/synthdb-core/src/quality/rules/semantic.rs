//! Value-format checks on columns selected by name.
//!
//! Each rule samples up to `sample_size` non-null values from every column
//! whose name matches (exact or substring, case-insensitive) and fails with
//! a warning when any sampled value does not fit the expected format.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rusqlite::types::Value as SqlValue;

use crate::quality::catalog::quote_ident;
use crate::quality::error::QualityResult;
use crate::quality::finding::{Finding, Severity};
use crate::quality::rule::{QualityRule, RuleContext, RuleParams};

pub const ZIPCODE: &str = "semantic_zipcode";
pub const EMAIL: &str = "semantic_email";
pub const DATE: &str = "semantic_date";
pub const EXPECTED_TYPE: &str = "semantic_expected_type";
pub const TRAILING_PUNCTUATION: &str = "semantic_trailing_punctuation";

const DEFAULT_SAMPLE_SIZE: u64 = 100;
const MAX_EXAMPLES: usize = 3;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Column selection by exact name or substring, case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMatcher {
    exact: Vec<String>,
    contains: Vec<String>,
}

impl ColumnMatcher {
    pub fn new(exact: Vec<String>, contains: Vec<String>) -> Self {
        Self {
            exact: exact.into_iter().map(|s| s.to_lowercase()).collect(),
            contains: contains.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Read `<prefix>columns` and `<prefix>contains` from the params.
    fn from_params(
        params: &RuleParams<'_>,
        prefix: &str,
        exact: &[&str],
        contains: &[&str],
    ) -> QualityResult<Self> {
        Ok(Self::new(
            params.strings_or(&format!("{prefix}columns"), exact)?,
            params.strings_or(&format!("{prefix}contains"), contains)?,
        ))
    }

    pub fn matches(&self, column: &str) -> bool {
        let name = column.to_lowercase();
        self.exact.iter().any(|e| *e == name) || self.contains.iter().any(|c| name.contains(c.as_str()))
    }
}

/// The format a sampled value must satisfy.
#[derive(Debug, Clone)]
pub enum ValueCheck {
    ZipCode(Regex),
    Email(Regex),
    Date,
    Text,
    Decimal,
    Integer,
    NoTrailingPunctuation,
}

impl ValueCheck {
    fn label(&self) -> &'static str {
        match self {
            ValueCheck::ZipCode(_) => "zip code",
            ValueCheck::Email(_) => "email address",
            ValueCheck::Date => "date",
            ValueCheck::Text => "text",
            ValueCheck::Decimal => "decimal",
            ValueCheck::Integer => "integer",
            ValueCheck::NoTrailingPunctuation => "no trailing punctuation",
        }
    }

    pub fn accepts(&self, value: &SqlValue) -> bool {
        match self {
            ValueCheck::ZipCode(re) | ValueCheck::Email(re) => {
                as_text(value).is_some_and(|s| re.is_match(s.trim()))
            }
            ValueCheck::Date => match value {
                SqlValue::Text(s) => parses_as_date(s.trim()),
                _ => false,
            },
            ValueCheck::Text => match value {
                SqlValue::Text(s) => {
                    let s = s.trim();
                    !s.is_empty() && s.parse::<f64>().is_err()
                }
                _ => false,
            },
            ValueCheck::Decimal => match value {
                SqlValue::Integer(_) => true,
                SqlValue::Real(f) => f.is_finite(),
                SqlValue::Text(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
                _ => false,
            },
            ValueCheck::Integer => match value {
                SqlValue::Integer(_) => true,
                SqlValue::Real(f) => f.is_finite() && f.fract() == 0.0,
                SqlValue::Text(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            ValueCheck::NoTrailingPunctuation => match value {
                SqlValue::Text(s) => !s
                    .trim_end()
                    .ends_with(['.', ',', ';', ':', '!', '?']),
                _ => true,
            },
        }
    }
}

fn as_text(value: &SqlValue) -> Option<Cow<'_, str>> {
    match value {
        SqlValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
        SqlValue::Integer(i) => Some(Cow::Owned(i.to_string())),
        SqlValue::Real(f) => Some(Cow::Owned(f.to_string())),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}

fn parses_as_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(s, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
}

fn display(value: &SqlValue) -> String {
    match value {
        SqlValue::Blob(b) => format!("<blob {} bytes>", b.len()),
        other => as_text(other).map(Cow::into_owned).unwrap_or_default(),
    }
}

/// A set of (column matcher, check) pairs sampled against every table.
#[derive(Debug, Clone)]
pub struct SemanticRule {
    id: &'static str,
    checks: Vec<(ColumnMatcher, ValueCheck)>,
    sample_size: u64,
}

impl SemanticRule {
    pub fn new(id: &'static str, checks: Vec<(ColumnMatcher, ValueCheck)>, sample_size: u64) -> Self {
        Self {
            id,
            checks,
            sample_size,
        }
    }

    fn sample_size(params: &RuleParams<'_>) -> QualityResult<u64> {
        let n = params.u64_or("sample_size", DEFAULT_SAMPLE_SIZE)?;
        if n == 0 {
            return Err(params.invalid("sample_size", "must be at least 1"));
        }
        Ok(n)
    }

    pub fn zipcode(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["columns", "contains", "country", "sample_size"])?;
        let matcher = ColumnMatcher::from_params(params, "", &[], &["zip", "postal", "postcode"])?;
        let pattern = match params.str_or("country", "US")?.to_ascii_uppercase().as_str() {
            "US" => r"^\d{5}(-\d{4})?$",
            "CA" => r"^[A-Za-z]\d[A-Za-z] ?\d[A-Za-z]\d$",
            "UK" | "GB" => r"^[A-Za-z]{1,2}\d[A-Za-z\d]? ?\d[A-Za-z]{2}$",
            _ => r"^\S.*$",
        };
        let re = Regex::new(pattern).map_err(|e| params.invalid("country", &e.to_string()))?;
        Ok(Box::new(Self::new(
            ZIPCODE,
            vec![(matcher, ValueCheck::ZipCode(re))],
            Self::sample_size(params)?,
        )))
    }

    pub fn email(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["columns", "contains", "sample_size"])?;
        let matcher = ColumnMatcher::from_params(params, "", &[], &["email", "e_mail"])?;
        let re = Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .map_err(|e| params.invalid("pattern", &e.to_string()))?;
        Ok(Box::new(Self::new(
            EMAIL,
            vec![(matcher, ValueCheck::Email(re))],
            Self::sample_size(params)?,
        )))
    }

    pub fn date(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["columns", "contains", "sample_size"])?;
        let matcher = ColumnMatcher::from_params(
            params,
            "",
            &["date", "datetime", "timestamp", "dob"],
            &["_date", "date_", "_at", "birthday"],
        )?;
        Ok(Box::new(Self::new(
            DATE,
            vec![(matcher, ValueCheck::Date)],
            Self::sample_size(params)?,
        )))
    }

    pub fn expected_type(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&[
            "string_columns",
            "string_contains",
            "decimal_columns",
            "decimal_contains",
            "integer_columns",
            "integer_contains",
            "sample_size",
        ])?;
        let text = ColumnMatcher::from_params(
            params,
            "string_",
            &[
                "name",
                "first_name",
                "last_name",
                "title",
                "description",
                "address",
                "city",
                "country",
                "street",
                "status",
                "category",
            ],
            &[],
        )?;
        let decimal = ColumnMatcher::from_params(
            params,
            "decimal_",
            &[],
            &["price", "amount", "cost", "salary", "balance", "total", "fee"],
        )?;
        let integer = ColumnMatcher::from_params(
            params,
            "integer_",
            &["id", "age", "year", "quantity", "qty", "count", "stock"],
            &["_id", "_count"],
        )?;
        Ok(Box::new(Self::new(
            EXPECTED_TYPE,
            vec![
                (text, ValueCheck::Text),
                (decimal, ValueCheck::Decimal),
                (integer, ValueCheck::Integer),
            ],
            Self::sample_size(params)?,
        )))
    }

    pub fn trailing_punctuation(params: &RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> {
        params.deny_unknown(&["columns", "contains", "sample_size"])?;
        let matcher = ColumnMatcher::from_params(
            params,
            "",
            &[],
            &["name", "title", "city", "country", "street", "address"],
        )?;
        Ok(Box::new(Self::new(
            TRAILING_PUNCTUATION,
            vec![(matcher, ValueCheck::NoTrailingPunctuation)],
            Self::sample_size(params)?,
        )))
    }
}

impl QualityRule for SemanticRule {
    fn id(&self) -> &str {
        self.id
    }

    fn run(&self, ctx: &RuleContext<'_>) -> QualityResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for table in &ctx.catalog.tables {
            for column in &table.columns {
                // First matching check wins for a column.
                let Some((_, check)) = self.checks.iter().find(|(m, _)| m.matches(&column.name))
                else {
                    continue;
                };

                let col = quote_ident(&column.name);
                let mut stmt = ctx.conn.prepare(&format!(
                    "SELECT {col} FROM {} WHERE {col} IS NOT NULL LIMIT ?1",
                    quote_ident(&table.name)
                ))?;
                let values = stmt
                    .query_map([self.sample_size as i64], |row| row.get::<_, SqlValue>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                if values.is_empty() {
                    continue;
                }

                let invalid: Vec<&SqlValue> = values.iter().filter(|v| !check.accepts(v)).collect();
                let examples: Vec<String> =
                    invalid.iter().take(MAX_EXAMPLES).map(|v| display(v)).collect();
                findings.push(
                    Finding::check(
                        self.id,
                        invalid.is_empty(),
                        Severity::Warn,
                        format!(
                            "{}.{}: {}/{} sampled values are not a valid {}",
                            table.name,
                            column.name,
                            invalid.len(),
                            values.len(),
                            check.label()
                        ),
                    )
                    .table(&table.name)
                    .column(&column.name)
                    .detail("sampled", values.len())
                    .detail("invalid", invalid.len())
                    .detail("examples", examples),
                );
            }
        }
        Ok(findings)
    }
}
