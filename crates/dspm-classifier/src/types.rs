//! Shared value types produced and consumed by the classifier.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Broad data-protection category a [`Rule`](crate::rule::Rule) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Pii,
    Phi,
    Pci,
    Secrets,
}

/// Ordinal severity of data exposure. `Critical` is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sensitivity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Sensitivity {
    /// Folds two sensitivities into the more severe of the two.
    pub fn max(self, other: Sensitivity) -> Sensitivity {
        std::cmp::max(self, other)
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Unknown
    }
}

/// One rule's aggregated hits within a single classified content blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub rule_name: String,
    pub category: Category,
    pub sensitivity: Sensitivity,
    /// First two and last two characters preserved, middle masked.
    pub redacted_value: String,
    pub count: u32,
    /// 1-indexed line numbers, at most the first ten distinct ones.
    pub line_numbers: Vec<u32>,
    pub confidence: f64,
}

/// Aggregate result of classifying one piece of content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyResult {
    pub matches: Vec<Match>,
    pub total_findings: u64,
    pub categories: HashSet<Category>,
    pub max_sensitivity: Sensitivity,
}

impl ClassifyResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitivity_ordering_places_critical_highest() {
        assert!(Sensitivity::Critical > Sensitivity::High);
        assert!(Sensitivity::High > Sensitivity::Medium);
        assert!(Sensitivity::Medium > Sensitivity::Low);
        assert!(Sensitivity::Low > Sensitivity::Unknown);
    }

    #[test]
    fn sensitivity_max_takes_more_severe() {
        assert_eq!(Sensitivity::Low.max(Sensitivity::Critical), Sensitivity::Critical);
        assert_eq!(Sensitivity::High.max(Sensitivity::Medium), Sensitivity::High);
    }

    #[test]
    fn classify_result_default_is_empty() {
        let result = ClassifyResult::default();
        assert!(result.is_empty());
        assert_eq!(result.total_findings, 0);
        assert_eq!(result.max_sensitivity, Sensitivity::Unknown);
    }
}
