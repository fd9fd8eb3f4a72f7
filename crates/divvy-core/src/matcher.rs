//! Rule matching: first active rule whose predicate accepts a transaction
//!
//! The matcher is a pure function over a transaction and a rule slice that is
//! already sorted by ascending priority (ties broken by creation time, then
//! id — see `Database::active_rules`). Evaluation stops at the first match.

use regex::Regex;

use crate::error::Result;
use crate::models::{RuleType, SplittingRule, Transaction};

/// Wildcard tokens that turn a merchant pattern into a regex match instead of
/// an exact comparison.
const WILDCARD_TOKENS: [&str; 2] = [".*", ".+"];

/// True if the merchant pattern should be evaluated as a regex.
pub fn is_wildcard_pattern(pattern: &str) -> bool {
    WILDCARD_TOKENS.iter().any(|t| pattern.contains(t))
}

/// Compile a wildcard merchant pattern into its anchored, case-insensitive
/// regex form. Rule creation calls this to reject malformed patterns before
/// anything is stored.
pub fn compile_wildcard(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("(?i)^(?:{})$", pattern))?)
}

/// A rule with its wildcard pattern compiled exactly once, so batch
/// evaluation does not rebuild the regex per transaction.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: SplittingRule,
    merchant_regex: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: SplittingRule) -> Result<Self> {
        let merchant_regex = match (rule.rule_type, rule.merchant_pattern.as_deref()) {
            (RuleType::Merchant, Some(p)) if is_wildcard_pattern(p) => {
                Some(compile_wildcard(p)?)
            }
            _ => None,
        };
        Ok(Self {
            rule,
            merchant_regex,
        })
    }

    pub fn rule(&self) -> &SplittingRule {
        &self.rule
    }

    /// Evaluate this rule's predicate against a transaction.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        match self.rule.rule_type {
            RuleType::Merchant => {
                let Some(pattern) = self.rule.merchant_pattern.as_deref() else {
                    // A merchant rule without a pattern can never match
                    return false;
                };
                match &self.merchant_regex {
                    // Case-insensitive full match over the merchant name
                    Some(re) => re.is_match(&transaction.merchant_name),
                    None => {
                        transaction.merchant_name.to_lowercase() == pattern.to_lowercase()
                    }
                }
            }
            RuleType::Category => {
                // Case-sensitive exact equality
                match (&self.rule.category_match, &transaction.category) {
                    (Some(want), Some(have)) => want == have,
                    _ => false,
                }
            }
            RuleType::AmountThreshold => {
                let amount = transaction.amount.abs();
                let min = self.rule.min_amount.unwrap_or(0.0);
                let max = self.rule.max_amount.unwrap_or(f64::INFINITY);
                amount >= min && amount <= max
            }
            RuleType::Default => true,
        }
    }
}

/// Compile a rule slice for repeated evaluation, preserving order.
pub fn compile_rules<I>(rules: I) -> Result<Vec<CompiledRule>>
where
    I: IntoIterator<Item = SplittingRule>,
{
    rules.into_iter().map(CompiledRule::compile).collect()
}

/// Return the first rule in `rules` that matches `transaction`, or `None`.
///
/// `rules` must contain only active rules, sorted by evaluation order. Rules
/// after the first match are not evaluated.
pub fn find_matching_rule<'a>(
    transaction: &Transaction,
    rules: &'a [CompiledRule],
) -> Option<&'a SplittingRule> {
    rules
        .iter()
        .find(|r| r.matches(transaction))
        .map(|r| r.rule())
}

/// Evaluate a single rule's predicate against a transaction.
pub fn rule_matches(transaction: &Transaction, rule: &SplittingRule) -> Result<bool> {
    Ok(CompiledRule::compile(rule.clone())?.matches(transaction))
}
