//! The classifier itself: pure, deterministic, and side-effect free given
//! `(rules, content)`.

use std::sync::Arc;

use crate::redact::redact;
use crate::rule::RuleSet;
use crate::types::{ClassifyResult, Match, Sensitivity};

/// Tunables that affect which matches are surfaced without changing the
/// core pattern/validator algorithm.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Matches from rules whose base confidence is below this threshold are
    /// dropped entirely. Defaults to 0.0 (nothing filtered) — raising it is
    /// how an operator silences low-confidence rules like `GENERIC_API_KEY`.
    pub min_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_confidence: 0.0 }
    }
}

/// A constructed classifier snapshot: an immutable ruleset plus config.
/// Freely `Clone`/`Send`/`Sync` — intended to be shared across scanner
/// workers via an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            config: ClassifierConfig::default(),
        }
    }

    pub fn with_config(rules: Arc<RuleSet>, config: ClassifierConfig) -> Self {
        Self { rules, config }
    }

    /// Classifies a single piece of content against the injected ruleset.
    ///
    /// Never errors: an absent match is simply absent, and rule-construction
    /// failures are caught earlier, at ruleset build time.
    pub fn classify(&self, content: &str) -> ClassifyResult {
        let lines: Vec<&str> = content.split('\n').collect();
        let lowered_content = content.to_lowercase();

        let mut result = ClassifyResult::default();

        for rule in self.rules.rules() {
            if rule.confidence < self.config.min_confidence {
                continue;
            }

            let context_found = if !rule.context_required {
                true
            } else {
                rule.context_patterns
                    .iter()
                    .any(|p| p.is_match(&lowered_content))
            };

            if !context_found {
                continue;
            }

            let mut literal_first: Option<String> = None;
            let mut line_numbers: Vec<u32> = Vec::new();
            let mut count: u32 = 0;

            for (line_idx, line) in lines.iter().enumerate() {
                let line_number = (line_idx + 1) as u32;

                for pattern in &rule.patterns {
                    for m in pattern.find_iter(line) {
                        let literal = m.as_str();
                        if !rule.validators.iter().all(|v| v(literal)) {
                            continue;
                        }

                        count += 1;
                        if literal_first.is_none() {
                            literal_first = Some(literal.to_string());
                        }
                        if !line_numbers.contains(&line_number) && line_numbers.len() < 10 {
                            line_numbers.push(line_number);
                        }
                    }
                }
            }

            if count == 0 {
                continue;
            }

            let redacted_value = redact(literal_first.as_deref().unwrap_or(""));
            let found = Match {
                rule_name: rule.name.clone(),
                category: rule.category,
                sensitivity: rule.sensitivity,
                redacted_value,
                count,
                line_numbers,
                confidence: rule.confidence,
            };

            result.total_findings += found.count as u64;
            result.categories.insert(found.category);
            result.max_sensitivity = result.max_sensitivity.max(found.sensitivity);
            result.matches.push(found);
        }

        result
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(Arc::new(crate::default_rules::DEFAULT_RULES.clone()))
    }
}

pub fn max_sensitivity_order() -> [Sensitivity; 5] {
    [
        Sensitivity::Critical,
        Sensitivity::High,
        Sensitivity::Medium,
        Sensitivity::Low,
        Sensitivity::Unknown,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::default()
    }

    #[test]
    fn s1_ssn_in_prose_is_classified_critical_pii() {
        let result = classifier().classify("My SSN is 123-45-6789");
        assert_eq!(result.matches.len(), 1);
        let m = &result.matches[0];
        assert_eq!(m.rule_name, "SSN");
        assert_eq!(m.redacted_value, "12*******89");
        assert_eq!(m.category, crate::types::Category::Pii);
        assert_eq!(m.sensitivity, Sensitivity::Critical);
        assert_eq!(m.line_numbers, vec![1]);
    }

    #[test]
    fn s2_luhn_valid_card_matches_invalid_does_not() {
        let good = classifier().classify("Card: 4532015112830366");
        assert!(good.matches.iter().any(|m| m.rule_name == "CREDIT_CARD"));

        let bad = classifier().classify("Card: 4532015112830367");
        assert!(!bad.matches.iter().any(|m| m.rule_name == "CREDIT_CARD"));
    }

    #[test]
    fn s3_invalid_ssn_area_code_yields_zero_matches() {
        let result = classifier().classify("SSN: 000-12-3456");
        assert!(!result.matches.iter().any(|m| m.rule_name == "SSN"));
    }

    #[test]
    fn empty_content_yields_zero_matches() {
        let result = classifier().classify("");
        assert!(result.is_empty());
        assert_eq!(result.total_findings, 0);
    }

    #[test]
    fn multiple_matches_on_one_line_all_counted() {
        let result = classifier().classify("alice@example.com bob@example.com");
        let email = result
            .matches
            .iter()
            .find(|m| m.rule_name == "EMAIL")
            .unwrap();
        assert_eq!(email.count, 2);
        assert_eq!(email.line_numbers, vec![1]);
    }

    #[test]
    fn line_numbers_cap_at_ten_distinct_lines() {
        let content = (1..=15)
            .map(|_| "alice@example.com")
            .collect::<Vec<_>>()
            .join("\n");
        let result = classifier().classify(&content);
        let email = result
            .matches
            .iter()
            .find(|m| m.rule_name == "EMAIL")
            .unwrap();
        assert_eq!(email.line_numbers.len(), 10);
        assert_eq!(email.count, 15);
    }

    #[test]
    fn context_required_rule_is_silent_without_context() {
        let result = classifier().classify("Passport: AB1234567");
        assert!(!result.matches.iter().any(|m| m.rule_name == "PASSPORT"));
    }

    #[test]
    fn context_required_rule_fires_with_context() {
        let result = classifier().classify("My passport number is AB1234567");
        assert!(result.matches.iter().any(|m| m.rule_name == "PASSPORT"));
    }

    #[test]
    fn max_sensitivity_tracks_the_most_severe_match() {
        let result = classifier().classify("contact me at alice@example.com, SSN 123-45-6789");
        assert_eq!(result.max_sensitivity, Sensitivity::Critical);
        assert!(result.categories.contains(&crate::types::Category::Pii));
    }

    #[test]
    fn min_confidence_filters_low_confidence_rules() {
        let rules = Arc::new(crate::default_rules::DEFAULT_RULES.clone());
        let strict = Classifier::with_config(
            rules,
            ClassifierConfig { min_confidence: 0.6 },
        );
        let result = strict.classify("my api_key: abcd1234abcd1234abcd1234abcd1234");
        assert!(!result.matches.iter().any(|m| m.rule_name == "GENERIC_API_KEY"));
    }
}
