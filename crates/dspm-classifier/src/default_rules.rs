//! The built-in ruleset shipped with the classifier.
//!
//! Covers SSN, email, US phone/address, DOB, passport, MRN, ICD code, NDC,
//! credit card, bank account, routing number, IBAN, AWS keys, PEM private
//! keys, JWT, GitHub and Slack tokens, Google API keys, Azure connection
//! strings, DB connection URLs, and a low-confidence generic API key
//! heuristic.

use once_cell::sync::Lazy;

use crate::rule::{RuleSet, RuleSetBuilder, RuleSpec};
use crate::types::{Category, Sensitivity};
use crate::validators::{validate_aba_routing, validate_iban, validate_luhn, validate_ssn};

/// The default ruleset, compiled once per process.
///
/// Rule construction failure is a programmer error, not a runtime one —
/// `expect` is deliberate here, not a shortcut.
pub static DEFAULT_RULES: Lazy<RuleSet> =
    Lazy::new(|| build_default_rules().expect("built-in ruleset must compile"));

fn build_default_rules() -> Result<RuleSet, crate::rule::RuleError> {
    let mut builder: RuleSetBuilder = RuleSet::builder();

    builder = builder.add_rule(
        RuleSpec::new("SSN", Category::Pii, Sensitivity::Critical)
            .with_pattern(r"\b\d{3}[-\s]\d{2}[-\s]\d{4}\b")
            .with_validator(validate_ssn),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("EMAIL", Category::Pii, Sensitivity::Medium)
            .with_pattern(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("US_PHONE", Category::Pii, Sensitivity::Medium).with_pattern(
            r"\b(?:\+1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b",
        ),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("US_ADDRESS", Category::Pii, Sensitivity::Medium).with_pattern(
            r"(?i)\b\d{1,5}\s+[A-Za-z0-9.\s]{2,30}\s+(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way|place|pl)\b",
        ),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("DOB", Category::Pii, Sensitivity::Medium)
            .with_pattern(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b")
            .with_pattern(r"\b\d{4}-\d{2}-\d{2}\b")
            .with_context_pattern(r"(?i)\b(dob|birth|born|birthday)\b")
            .require_context(),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("PASSPORT", Category::Pii, Sensitivity::High)
            .with_pattern(r"\b[A-Z]{1,2}\d{6,9}\b")
            .with_context_pattern(r"(?i)passport")
            .require_context(),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("MRN", Category::Phi, Sensitivity::High)
            .with_pattern(r"(?i)\bMRN[:\s#-]*\d{6,10}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("ICD_CODE", Category::Phi, Sensitivity::Medium)
            .with_pattern(r"\b[A-TV-Z]\d{2}(?:\.\d{1,4})?\b")
            .with_context_pattern(r"(?i)\b(icd|diagnosis|diagnoses)\b")
            .require_context(),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("NDC", Category::Phi, Sensitivity::Medium)
            .with_pattern(r"\b\d{4,5}-\d{3,4}-\d{1,2}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("CREDIT_CARD", Category::Pci, Sensitivity::Critical)
            .with_pattern(r"\b(?:\d[ -]?){13,19}\b")
            .with_validator(validate_luhn),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("BANK_ACCOUNT", Category::Pci, Sensitivity::High)
            .with_pattern(r"\b\d{8,17}\b")
            .with_context_pattern(r"(?i)\b(bank\s*account|account\s*(number|no|#))\b")
            .require_context(),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("ROUTING_NUMBER", Category::Pci, Sensitivity::High)
            .with_pattern(r"\b\d{9}\b")
            .with_context_pattern(r"(?i)\b(routing|aba)\b")
            .require_context()
            .with_validator(validate_aba_routing),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("IBAN", Category::Pci, Sensitivity::High)
            .with_pattern(r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b")
            .with_validator(validate_iban),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("AWS_ACCESS_KEY", Category::Secrets, Sensitivity::Critical)
            .with_pattern(r"\bAKIA[0-9A-Z]{16}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("AWS_SECRET_KEY", Category::Secrets, Sensitivity::Critical)
            .with_pattern(r"\b[A-Za-z0-9/+=]{40}\b")
            .with_context_pattern(r"(?i)aws.*secret")
            .require_context(),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("PRIVATE_KEY", Category::Secrets, Sensitivity::Critical).with_pattern(
            r"-----BEGIN (?:RSA |EC |OPENSSH |DSA |PGP )?PRIVATE KEY-----",
        ),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("JWT", Category::Secrets, Sensitivity::High).with_pattern(
            r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b",
        ),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("GITHUB_TOKEN", Category::Secrets, Sensitivity::High)
            .with_pattern(r"\bgh[pousr]_[A-Za-z0-9]{36}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("SLACK_TOKEN", Category::Secrets, Sensitivity::High)
            .with_pattern(r"\bxox[baprs]-[A-Za-z0-9-]{10,48}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("GOOGLE_API_KEY", Category::Secrets, Sensitivity::High)
            .with_pattern(r"\bAIza[0-9A-Za-z_-]{35}\b"),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("AZURE_CONNECTION_STRING", Category::Secrets, Sensitivity::High)
            .with_pattern(
                r"(?i)DefaultEndpointsProtocol=https?;AccountName=[^;]+;AccountKey=[A-Za-z0-9+/=]{20,}",
            ),
    )?;

    builder = builder.add_rule(
        RuleSpec::new("DB_CONNECTION_URL", Category::Secrets, Sensitivity::Critical).with_pattern(
            r"(?i)\b(?:postgres(?:ql)?|mysql|mongodb(?:\+srv)?)://[^:\s]+:[^@\s]+@[^\s/]+",
        ),
    )?;

    // Open Question (a): prone to false positives. Shipped with reduced
    // confidence rather than excluded outright, so operators can raise
    // `ClassifierConfig::min_confidence` to silence it without losing the
    // signal entirely.
    builder = builder.add_rule(
        RuleSpec::new("GENERIC_API_KEY", Category::Secrets, Sensitivity::Medium)
            .with_pattern(r"\b[A-Za-z0-9]{32,64}\b")
            .with_context_pattern(r"(?i)\b(api[_-]?key|apikey|secret|token)\b")
            .require_context()
            .with_confidence(0.5),
    )?;

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ruleset_compiles_and_is_nonempty() {
        assert!(!DEFAULT_RULES.rules().is_empty());
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names: Vec<&str> = DEFAULT_RULES.rules().iter().map(|r| r.name.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn generic_api_key_carries_reduced_confidence() {
        let rule = DEFAULT_RULES
            .rules()
            .iter()
            .find(|r| r.name == "GENERIC_API_KEY")
            .unwrap();
        assert!(rule.confidence < 1.0);
        assert!(rule.context_required);
    }
}
