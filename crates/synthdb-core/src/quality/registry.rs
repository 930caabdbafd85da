//! Rule registry: identifier → constructor.
//!
//! Populated once, then handed read-only to every gate built from it. Rule
//! identifiers are resolved when the gate is constructed, so a misspelled id
//! fails fast instead of at evaluation time.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{QualityError, QualityResult};
use super::rule::{QualityRule, RuleParams, RuleSpec};
use super::rules::basic::{self, ForeignKeyRule, NullRateRule, RowCountRule};
use super::rules::schema::{
    self, CompositePrimaryKeyRule, IsolatedTableRule, MultipleFkReferenceRule,
    PrimaryKeyShapeRule, VarcharLengthRule,
};
use super::rules::semantic::{self, SemanticRule};

/// Builds a rule from its parameters.
pub type RuleFactory =
    Arc<dyn Fn(&RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct RuleRegistry {
    factories: BTreeMap<String, RuleFactory>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleRegistry {
    /// A registry with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry
            .register(basic::ROW_COUNT, RowCountRule::from_params)
            .register(basic::NULL_RATE, NullRateRule::from_params)
            .register(basic::FK_INTEGRITY, ForeignKeyRule::from_params)
            .register(schema::VARCHAR_LENGTH, VarcharLengthRule::from_params)
            .register(schema::PRIMARY_KEY_SHAPE, PrimaryKeyShapeRule::from_params)
            .register(schema::COMPOSITE_PRIMARY_KEY, CompositePrimaryKeyRule::from_params)
            .register(schema::ISOLATED_TABLE, IsolatedTableRule::from_params)
            .register(schema::MULTIPLE_FK_REFERENCE, MultipleFkReferenceRule::from_params)
            .register(semantic::ZIPCODE, SemanticRule::zipcode)
            .register(semantic::EMAIL, SemanticRule::email)
            .register(semantic::DATE, SemanticRule::date)
            .register(semantic::EXPECTED_TYPE, SemanticRule::expected_type)
            .register(semantic::TRAILING_PUNCTUATION, SemanticRule::trailing_punctuation);
        registry
    }

    /// Register `factory` under `id`, replacing any previous entry.
    pub fn register<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn(&RuleParams<'_>) -> QualityResult<Box<dyn QualityRule>> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_string(), Arc::new(factory));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the rule a spec names.
    pub fn build(&self, spec: &RuleSpec) -> QualityResult<Box<dyn QualityRule>> {
        let factory = self
            .factories
            .get(&spec.rule)
            .ok_or_else(|| QualityError::UnknownRule(spec.rule.clone()))?;
        factory(&RuleParams::new(&spec.rule, &spec.params))
    }
}
