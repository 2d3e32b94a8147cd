//! Rule definitions and the registration interface used to build a ruleset.

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::types::{Category, Sensitivity};

/// A semantic validator run against a literal match. Rules reference these
/// by function pointer rather than by name so an invalid validator can
/// never be referenced at construction time.
pub type ValidatorFn = fn(&str) -> bool;

/// Declarative description of a rule, before its patterns are compiled.
///
/// Any additional rule, built-in or operator-supplied, is described this way
/// and compiled through [`RuleSetBuilder::add_rule`].
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub category: Category,
    pub sensitivity: Sensitivity,
    pub patterns: Vec<String>,
    pub context_patterns: Vec<String>,
    pub context_required: bool,
    pub validators: Vec<ValidatorFn>,
    /// Base confidence assigned to matches from this rule. Most rules are
    /// unambiguous enough to carry 1.0; rules prone to false positives
    /// (e.g. the generic API key heuristic) ship with a lower value so
    /// operators can filter on it via `ClassifierConfig::min_confidence`.
    pub confidence: f64,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, category: Category, sensitivity: Sensitivity) -> Self {
        Self {
            name: name.into(),
            category,
            sensitivity,
            patterns: Vec::new(),
            context_patterns: Vec::new(),
            context_required: false,
            validators: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn with_context_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.context_patterns.push(pattern.into());
        self
    }

    pub fn require_context(mut self) -> Self {
        self.context_required = true;
        self
    }

    pub fn with_validator(mut self, validator: ValidatorFn) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// A compiled, immutable rule. The active ruleset is a snapshot injected at
/// classifier construction and never mutates afterward.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub category: Category,
    pub sensitivity: Sensitivity,
    pub(crate) patterns: Vec<Regex>,
    pub(crate) context_patterns: Vec<Regex>,
    pub context_required: bool,
    pub(crate) validators: Vec<ValidatorFn>,
    pub confidence: f64,
}

/// Errors raised while compiling a [`RuleSpec`] into a [`Rule`].
///
/// An invalid regex is a fatal, programmer-level error detected at
/// construction — it never surfaces during `classify`.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{0}' has an invalid pattern: {1}")]
    InvalidPattern(String, regex::Error),
    #[error("rule '{0}' has an invalid context pattern: {1}")]
    InvalidContextPattern(String, regex::Error),
    #[error("duplicate rule name '{0}'")]
    DuplicateName(String),
}

impl Rule {
    fn compile(spec: RuleSpec) -> Result<Rule, RuleError> {
        let patterns = spec
            .patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| RuleError::InvalidPattern(spec.name.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;

        let context_patterns = spec
            .context_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| RuleError::InvalidContextPattern(spec.name.clone(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            name: spec.name,
            category: spec.category,
            sensitivity: spec.sensitivity,
            patterns,
            context_patterns,
            context_required: spec.context_required,
            validators: spec.validators,
            confidence: spec.confidence,
        })
    }
}

/// An immutable collection of compiled rules, shared freely across
/// classifier instances.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }
}

/// Builder enforcing unique rule names before compilation.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    specs: Vec<RuleSpec>,
    seen_names: HashSet<String>,
}

impl RuleSetBuilder {
    pub fn add_rule(mut self, spec: RuleSpec) -> Result<Self, RuleError> {
        if !self.seen_names.insert(spec.name.clone()) {
            return Err(RuleError::DuplicateName(spec.name));
        }
        self.specs.push(spec);
        Ok(self)
    }

    pub fn build(self) -> Result<RuleSet, RuleError> {
        let rules = self
            .specs
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet { rules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_duplicate_names() {
        let builder = RuleSetBuilder::default();
        let builder = builder
            .add_rule(RuleSpec::new("DUP", Category::Pii, Sensitivity::Low).with_pattern("a"))
            .unwrap();
        let err = builder
            .add_rule(RuleSpec::new("DUP", Category::Pii, Sensitivity::Low).with_pattern("b"))
            .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateName(name) if name == "DUP"));
    }

    #[test]
    fn builder_rejects_invalid_regex() {
        let builder = RuleSetBuilder::default();
        let err = builder
            .add_rule(RuleSpec::new("BAD", Category::Pii, Sensitivity::Low).with_pattern("("))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidPattern(name, _) if name == "BAD"));
    }

    #[test]
    fn build_succeeds_with_valid_rules() {
        let set = RuleSetBuilder::default()
            .add_rule(RuleSpec::new("OK", Category::Secrets, Sensitivity::High).with_pattern("x+"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(set.rules().len(), 1);
        assert_eq!(set.rules()[0].name, "OK");
    }
}
