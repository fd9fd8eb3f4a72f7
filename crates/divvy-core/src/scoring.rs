//! Confidence scoring for applied rules
//!
//! Scores are a fixed lookup driven only by rule type and match exactness,
//! persisted at categorization time rather than re-derived on read. The
//! closed `RuleType` enum makes the table exhaustive: adding a rule type
//! without a score is a compile error.

use crate::matcher::is_wildcard_pattern;
use crate::models::{RuleType, SplittingRule};

/// Exact merchant string equality
pub const SCORE_MERCHANT_EXACT: i64 = 100;
/// Merchant wildcard pattern match
pub const SCORE_MERCHANT_WILDCARD: i64 = 85;
/// Category equality
pub const SCORE_CATEGORY: i64 = 95;
/// Amount-threshold range match
pub const SCORE_AMOUNT_THRESHOLD: i64 = 80;
/// Catch-all default rule
pub const SCORE_DEFAULT: i64 = 60;

/// Confidence score (0-100) for a transaction matched by `rule`.
pub fn confidence_score(rule: &SplittingRule) -> i64 {
    match rule.rule_type {
        RuleType::Merchant => {
            if rule
                .merchant_pattern
                .as_deref()
                .is_some_and(is_wildcard_pattern)
            {
                SCORE_MERCHANT_WILDCARD
            } else {
                SCORE_MERCHANT_EXACT
            }
        }
        RuleType::Category => SCORE_CATEGORY,
        RuleType::AmountThreshold => SCORE_AMOUNT_THRESHOLD,
        RuleType::Default => SCORE_DEFAULT,
    }
}

/// Bucketed confidence level for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    None,
}

impl ConfidenceLevel {
    /// high >= 95, medium 70-94, low 50-69, none otherwise (including absent)
    pub fn from_score(score: Option<i64>) -> Self {
        match score {
            Some(s) if s >= 95 => Self::High,
            Some(s) if s >= 70 => Self::Medium,
            Some(s) if s >= 50 => Self::Low,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::rule;

    #[test]
    fn test_score_table() {
        assert_eq!(
            confidence_score(&rule(1, RuleType::Merchant, 1).merchant("Tesco Superstore")),
            100
        );
        assert_eq!(
            confidence_score(&rule(1, RuleType::Merchant, 1).merchant("Tesco.*")),
            85
        );
        assert_eq!(
            confidence_score(&rule(1, RuleType::Merchant, 1).merchant("Uber.+")),
            85
        );
        assert_eq!(
            confidence_score(&rule(1, RuleType::Category, 1).category("groceries")),
            95
        );
        assert_eq!(
            confidence_score(&rule(1, RuleType::AmountThreshold, 1).amounts(None, Some(20.0))),
            80
        );
        assert_eq!(confidence_score(&rule(1, RuleType::Default, 99)), 60);
    }

    #[test]
    fn test_confidence_level_boundaries() {
        assert_eq!(ConfidenceLevel::from_score(Some(100)), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(Some(95)), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(Some(94)), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(Some(70)), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(Some(69)), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(Some(50)), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(Some(49)), ConfidenceLevel::None);
        assert_eq!(ConfidenceLevel::from_score(None), ConfidenceLevel::None);
    }
}
