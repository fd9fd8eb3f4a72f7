//! Domain models for Divvy

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A household: a group of members who may share expenses.
///
/// Splitting rules are scoped to exactly one household. Membership management
/// (invitations, roles) lives upstream; this core only needs the member set
/// for split validation and override authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A member of a household, identified by email.
///
/// The email doubles as the caller identity the API layer extracts from
/// request headers, and as the key space for `split_percentage` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdMember {
    pub household_id: i64,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

/// A bank account. Transactions are owned by their account, and transitively
/// by the account's owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

/// The type of predicate a splitting rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Match on merchant name (exact or wildcard pattern)
    Merchant,
    /// Match on transaction category (case-sensitive equality)
    Category,
    /// Match on absolute amount falling inside [min_amount, max_amount]
    AmountThreshold,
    /// Catch-all; matches every transaction
    Default,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merchant => "merchant",
            Self::Category => "category",
            Self::AmountThreshold => "amount_threshold",
            Self::Default => "default",
        }
    }
}

impl std::str::FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "merchant" => Ok(Self::Merchant),
            "category" => Ok(Self::Category),
            "amount_threshold" => Ok(Self::AmountThreshold),
            "default" => Ok(Self::Default),
            _ => Err(format!("Unknown rule type: {}", s)),
        }
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A household-scoped, user-authored classification rule.
///
/// Rules are evaluated in ascending `priority` order (lower first); ties are
/// broken by `created_at` then `id`, so evaluation order is always
/// deterministic. A `default` rule matches unconditionally and should carry
/// the largest priority among active rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplittingRule {
    pub id: i64,
    pub household_id: i64,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub priority: i64,
    /// Exact merchant string, or a wildcard pattern containing `.*`/`.+`
    pub merchant_pattern: Option<String>,
    pub category_match: Option<String>,
    /// Absolute-value lower bound; 0 if absent
    pub min_amount: Option<f64>,
    /// Absolute-value upper bound; open-ended if absent
    pub max_amount: Option<f64>,
    /// Member email -> percentage; values sum to 100 when present
    pub split_percentage: Option<HashMap<String, f64>>,
    pub is_active: bool,
    /// Consumed once at creation time by the recategorization batch job
    pub apply_to_existing_transactions: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl SplittingRule {
    /// A rule with a non-empty split map marks matched transactions as shared.
    pub fn has_split(&self) -> bool {
        self.split_percentage.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// Fields supplied when creating a rule. The id and timestamp are assigned by
/// the database; `created_by` is the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSplittingRule {
    pub household_id: i64,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub priority: i64,
    pub merchant_pattern: Option<String>,
    pub category_match: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub split_percentage: Option<HashMap<String, f64>>,
    pub is_active: bool,
    pub apply_to_existing_transactions: bool,
    pub created_by: String,
}

/// Sort order for rule listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOrder {
    Priority,
    CreatedAt,
}

impl RuleOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::CreatedAt => "created_at",
        }
    }
}

impl std::str::FromStr for RuleOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "priority" => Ok(Self::Priority),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(format!("Unknown rule order: {}", s)),
        }
    }
}

/// A financial transaction, restricted to the fields the rule engine reads
/// and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    /// Signed currency value; predicates operate on the absolute value
    pub amount: f64,
    pub merchant_name: String,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub is_shared_expense: bool,
    pub shared_with_household_id: Option<i64>,
    /// The rule last applied, preserved across manual overrides for audit
    pub splitting_rule_id: Option<i64>,
    pub confidence_score: Option<i64>,
    /// Effective split (from the applied rule or the latest override)
    pub split_percentage: Option<HashMap<String, f64>>,
    pub manual_override: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when inserting a transaction (normally by the ingestion
/// layer upstream of this core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: f64,
    pub merchant_name: String,
    pub category: Option<String>,
    pub date: NaiveDate,
}

/// Append-only audit record of a manual override. Created exactly once per
/// override action; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOverride {
    pub id: i64,
    pub transaction_id: i64,
    /// The rule that was applied before the override, if any
    pub original_rule_id: Option<i64>,
    pub override_by: String,
    pub old_is_shared_expense: bool,
    pub new_is_shared_expense: bool,
    pub old_split_percentage: Option<HashMap<String, f64>>,
    pub new_split_percentage: Option<HashMap<String, f64>>,
    pub override_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the user did with an automatic categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    Accepted,
    Rejected,
    Overridden,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Overridden => "overridden",
        }
    }
}

impl std::str::FromStr for UserAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "overridden" => Ok(Self::Overridden),
            _ => Err(format!("Unknown user action: {}", s)),
        }
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only analytics record of an accept/reject/override decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFeedback {
    pub id: i64,
    pub transaction_id: i64,
    pub rule_id: Option<i64>,
    pub household_id: Option<i64>,
    pub user_action: UserAction,
    pub original_confidence_score: Option<i64>,
    pub override_details: Option<HashMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when recording feedback.
#[derive(Debug, Clone)]
pub struct NewRuleFeedback {
    pub transaction_id: i64,
    pub rule_id: Option<i64>,
    pub household_id: Option<i64>,
    pub user_action: UserAction,
    pub original_confidence_score: Option<i64>,
    pub override_details: Option<HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_round_trip() {
        for rt in [
            RuleType::Merchant,
            RuleType::Category,
            RuleType::AmountThreshold,
            RuleType::Default,
        ] {
            assert_eq!(rt.as_str().parse::<RuleType>().unwrap(), rt);
        }
        assert!("merchant_pattern".parse::<RuleType>().is_err());
    }

    #[test]
    fn test_user_action_round_trip() {
        for ua in [
            UserAction::Accepted,
            UserAction::Rejected,
            UserAction::Overridden,
        ] {
            assert_eq!(ua.as_str().parse::<UserAction>().unwrap(), ua);
        }
    }

    #[test]
    fn test_has_split() {
        let mut rule = SplittingRule {
            id: 1,
            household_id: 1,
            rule_name: "r".to_string(),
            rule_type: RuleType::Default,
            priority: 100,
            merchant_pattern: None,
            category_match: None,
            min_amount: None,
            max_amount: None,
            split_percentage: None,
            is_active: true,
            apply_to_existing_transactions: false,
            created_by: "a@example.com".to_string(),
            created_at: Utc::now(),
        };
        assert!(!rule.has_split());

        rule.split_percentage = Some(HashMap::new());
        assert!(!rule.has_split());

        rule.split_percentage =
            Some(HashMap::from([("a@example.com".to_string(), 100.0)]));
        assert!(rule.has_split());
    }
}
