//! Shared fixtures for engine unit tests

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use crate::models::{RuleType, SplittingRule, Transaction};

pub fn transaction(merchant: &str, category: Option<&str>, amount: f64) -> Transaction {
    Transaction {
        id: 1,
        account_id: 1,
        amount,
        merchant_name: merchant.to_string(),
        category: category.map(|c| c.to_string()),
        date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        is_shared_expense: false,
        shared_with_household_id: None,
        splitting_rule_id: None,
        confidence_score: None,
        split_percentage: None,
        manual_override: false,
        created_at: Utc::now(),
    }
}

pub fn rule(id: i64, rule_type: RuleType, priority: i64) -> SplittingRule {
    SplittingRule {
        id,
        household_id: 1,
        rule_name: format!("rule-{}", id),
        rule_type,
        priority,
        merchant_pattern: None,
        category_match: None,
        min_amount: None,
        max_amount: None,
        split_percentage: None,
        is_active: true,
        apply_to_existing_transactions: false,
        created_by: "alice@example.com".to_string(),
        created_at: Utc::now(),
    }
}

// Builder-style helpers so tests read as one expression.
impl SplittingRule {
    pub fn merchant(mut self, pattern: &str) -> Self {
        self.merchant_pattern = Some(pattern.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category_match = Some(category.to_string());
        self
    }

    pub fn amounts(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn split(mut self, entries: &[(&str, f64)]) -> Self {
        let map: HashMap<String, f64> = entries
            .iter()
            .map(|(email, pct)| (email.to_string(), *pct))
            .collect();
        self.split_percentage = Some(map);
        self
    }
}
