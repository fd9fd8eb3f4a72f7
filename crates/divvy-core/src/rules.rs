//! Rule creation and listing with validation and conflict warnings

use serde::Serialize;
use tracing::info;

use crate::conflict::{self, ConflictWarning};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::matcher;
use crate::models::{NewSplittingRule, RuleOrder, RuleType, SplittingRule};
use crate::split;

/// A created rule plus any non-blocking overlap warnings.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRule {
    pub rule: SplittingRule,
    pub conflicts: Vec<ConflictWarning>,
}

/// Validate and create a rule.
///
/// Conflicts with existing active rules of the same type are reported but
/// never block creation. Rejects before any state change when the rule shape
/// is invalid, the split percentages do not sum to 100, or a split key is not
/// a member of the household.
pub fn create_rule(db: &Database, new: &NewSplittingRule) -> Result<CreatedRule> {
    if db.get_household(new.household_id)?.is_none() {
        return Err(Error::NotFound(format!(
            "Household {} not found",
            new.household_id
        )));
    }

    validate_rule_shape(new)?;

    if let Some(split) = &new.split_percentage {
        if !split.is_empty() {
            split::validate_split_percentages(split)?;
            db.assert_household_members(new.household_id, split.keys())?;
        }
    }

    // Warnings are computed against the pre-insert rule set so the new rule
    // never conflicts with itself.
    let existing = db.active_rules(new.household_id)?;
    let conflicts = conflict::detect_conflicts(new, &existing);

    let id = db.create_rule(new)?;
    let rule = db
        .get_rule(id)?
        .ok_or_else(|| Error::NotFound(format!("Rule {} not found after creation", id)))?;

    info!(
        rule_id = id,
        household_id = new.household_id,
        rule_type = %new.rule_type,
        conflicts = conflicts.len(),
        "rule created"
    );

    Ok(CreatedRule { rule, conflicts })
}

/// List a household's rules in the requested order.
pub fn list_rules(
    db: &Database,
    household_id: i64,
    active_only: bool,
    order: RuleOrder,
) -> Result<Vec<SplittingRule>> {
    if db.get_household(household_id)?.is_none() {
        return Err(Error::NotFound(format!(
            "Household {} not found",
            household_id
        )));
    }
    db.list_rules(household_id, active_only, order)
}

/// Type-specific field requirements.
fn validate_rule_shape(rule: &NewSplittingRule) -> Result<()> {
    if rule.rule_name.trim().is_empty() {
        return Err(Error::InvalidData("rule_name must not be empty".to_string()));
    }

    match rule.rule_type {
        RuleType::Merchant => {
            let pattern = rule.merchant_pattern.as_deref().unwrap_or("");
            if pattern.trim().is_empty() {
                return Err(Error::InvalidData(
                    "merchant rules require a merchant_pattern".to_string(),
                ));
            }
            // A malformed wildcard must fail here, not at evaluation time
            if matcher::is_wildcard_pattern(pattern) {
                matcher::compile_wildcard(pattern).map_err(|e| {
                    Error::InvalidData(format!("invalid merchant_pattern: {}", e))
                })?;
            }
        }
        RuleType::Category => {
            if rule
                .category_match
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
            {
                return Err(Error::InvalidData(
                    "category rules require a category_match".to_string(),
                ));
            }
        }
        RuleType::AmountThreshold => {
            if let (Some(min), Some(max)) = (rule.min_amount, rule.max_amount) {
                if min > max {
                    return Err(Error::InvalidData(format!(
                        "min_amount {} exceeds max_amount {}",
                        min, max
                    )));
                }
            }
            if rule.min_amount.is_some_and(|m| m < 0.0)
                || rule.max_amount.is_some_and(|m| m < 0.0)
            {
                return Err(Error::InvalidData(
                    "amount bounds must not be negative".to_string(),
                ));
            }
        }
        RuleType::Default => {
            // The catch-all carries no pattern constraints
            if rule.merchant_pattern.is_some()
                || rule.category_match.is_some()
                || rule.min_amount.is_some()
                || rule.max_amount.is_some()
            {
                return Err(Error::InvalidData(
                    "default rules must not carry pattern constraints".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn new_rule(household_id: i64, rule_type: RuleType, priority: i64) -> NewSplittingRule {
        NewSplittingRule {
            household_id,
            rule_name: "test rule".to_string(),
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
        }
    }

    fn seeded_db() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let household_id = db.create_household("test").unwrap();
        db.add_household_member(household_id, "alice@example.com")
            .unwrap();
        db.add_household_member(household_id, "bob@example.com")
            .unwrap();
        (db, household_id)
    }

    #[test]
    fn test_create_rule_with_split() {
        let (db, household_id) = seeded_db();
        let mut rule = new_rule(household_id, RuleType::Merchant, 1);
        rule.merchant_pattern = Some("Tesco".to_string());
        rule.split_percentage = Some(HashMap::from([
            ("alice@example.com".to_string(), 60.0),
            ("bob@example.com".to_string(), 40.0),
        ]));

        let created = create_rule(&db, &rule).unwrap();
        assert!(created.rule.id > 0);
        assert!(created.conflicts.is_empty());
        assert!(created.rule.has_split());
    }

    #[test]
    fn test_create_rule_rejects_non_member_split_keys() {
        let (db, household_id) = seeded_db();
        let mut rule = new_rule(household_id, RuleType::Merchant, 1);
        rule.merchant_pattern = Some("Tesco".to_string());
        rule.split_percentage = Some(HashMap::from([
            ("alice@example.com".to_string(), 50.0),
            ("stranger@example.com".to_string(), 50.0),
        ]));

        let err = create_rule(&db, &rule).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("stranger@example.com"));
    }

    #[test]
    fn test_create_rule_rejects_bad_percentage_sum() {
        let (db, household_id) = seeded_db();
        let mut rule = new_rule(household_id, RuleType::Merchant, 1);
        rule.merchant_pattern = Some("Tesco".to_string());
        rule.split_percentage = Some(HashMap::from([
            ("alice@example.com".to_string(), 50.0),
            ("bob@example.com".to_string(), 30.0),
        ]));

        let err = create_rule(&db, &rule).unwrap_err();
        assert!(err.to_string().contains("sum to 100%"));
    }

    #[test]
    fn test_create_rule_reports_conflicts_but_succeeds() {
        let (db, household_id) = seeded_db();
        let mut first = new_rule(household_id, RuleType::Merchant, 1);
        first.merchant_pattern = Some("Tesco".to_string());
        create_rule(&db, &first).unwrap();

        let mut second = new_rule(household_id, RuleType::Merchant, 2);
        second.merchant_pattern = Some("Tesco Superstore".to_string());
        let created = create_rule(&db, &second).unwrap();

        assert_eq!(created.conflicts.len(), 1);
        assert!(created.conflicts[0].reason.contains("priority 1"));
        // Both rules exist despite the warning
        assert_eq!(db.active_rules(household_id).unwrap().len(), 2);
    }

    #[test]
    fn test_shape_validation_per_type() {
        let (db, household_id) = seeded_db();

        // Merchant without a pattern
        let rule = new_rule(household_id, RuleType::Merchant, 1);
        assert!(create_rule(&db, &rule).is_err());

        // Category without a category
        let rule = new_rule(household_id, RuleType::Category, 1);
        assert!(create_rule(&db, &rule).is_err());

        // Inverted amount bounds
        let mut rule = new_rule(household_id, RuleType::AmountThreshold, 1);
        rule.min_amount = Some(100.0);
        rule.max_amount = Some(10.0);
        assert!(create_rule(&db, &rule).is_err());

        // Default with a stray constraint
        let mut rule = new_rule(household_id, RuleType::Default, 99);
        rule.merchant_pattern = Some("Tesco".to_string());
        assert!(create_rule(&db, &rule).is_err());

        // Default without constraints is fine
        let rule = new_rule(household_id, RuleType::Default, 99);
        assert!(create_rule(&db, &rule).is_ok());
    }

    #[test]
    fn test_create_rule_rejects_malformed_wildcard_pattern() {
        let (db, household_id) = seeded_db();
        let mut rule = new_rule(household_id, RuleType::Merchant, 1);
        rule.merchant_pattern = Some("Tesco(.*".to_string());

        let err = create_rule(&db, &rule).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("merchant_pattern"));
        // Nothing was stored
        assert!(db.active_rules(household_id).unwrap().is_empty());

        // A well-formed wildcard still passes
        let mut rule = new_rule(household_id, RuleType::Merchant, 1);
        rule.merchant_pattern = Some("Tesco.*".to_string());
        assert!(create_rule(&db, &rule).is_ok());
    }

    #[test]
    fn test_unknown_household_is_not_found() {
        let db = Database::in_memory().unwrap();
        let rule = new_rule(42, RuleType::Default, 99);
        assert!(matches!(
            create_rule(&db, &rule).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_priority_ties_resolve_by_creation_order() {
        let (db, household_id) = seeded_db();
        let mut a = new_rule(household_id, RuleType::Merchant, 5);
        a.rule_name = "first".to_string();
        a.merchant_pattern = Some("Tesco".to_string());
        let mut b = new_rule(household_id, RuleType::Merchant, 5);
        b.rule_name = "second".to_string();
        b.merchant_pattern = Some("Tesco".to_string());

        let a_id = create_rule(&db, &a).unwrap().rule.id;
        let b_id = create_rule(&db, &b).unwrap().rule.id;

        let ordered = db.active_rules(household_id).unwrap();
        let ids: Vec<i64> = ordered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a_id, b_id]);
    }
}
