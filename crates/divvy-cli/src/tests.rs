//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::NaiveDate;
use divvy_core::db::Database;
use divvy_core::models::{NewSplittingRule, NewTransaction, RuleType};

use crate::commands::{self, truncate};

fn setup_test_db() -> (tempfile::TempDir, std::path::PathBuf, Database) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("divvy.db");
    let db = Database::new(path.to_str().unwrap()).unwrap();
    (dir, path, db)
}

fn seed_household(db: &Database) -> (i64, i64) {
    let household_id = db.create_household("flat 4b").unwrap();
    db.add_household_member(household_id, "alice@example.com")
        .unwrap();
    db.add_household_member(household_id, "bob@example.com")
        .unwrap();
    let account_id = db.create_account("checking", "alice@example.com").unwrap();
    (household_id, account_id)
}

fn seed_transaction(db: &Database, account_id: i64, merchant: &str, amount: f64) -> i64 {
    db.insert_transaction(&NewTransaction {
        account_id,
        amount,
        merchant_name: merchant.to_string(),
        category: None,
        date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
    })
    .unwrap()
}

fn merchant_rule(household_id: i64, pattern: &str, priority: i64) -> NewSplittingRule {
    NewSplittingRule {
        household_id,
        rule_name: format!("{} rule", pattern),
        rule_type: RuleType::Merchant,
        priority,
        merchant_pattern: Some(pattern.to_string()),
        category_match: None,
        min_amount: None,
        max_amount: None,
        split_percentage: None,
        is_active: true,
        apply_to_existing_transactions: false,
        created_by: "alice@example.com".to_string(),
    }
}

// ========== Init Command Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new.db");

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    // Re-running init against an existing database is fine
    commands::cmd_init(&path).unwrap();
}

// ========== Rules Command Tests ==========

#[test]
fn test_cmd_rules_list_empty() {
    let (_dir, _path, db) = setup_test_db();
    let (household_id, _) = seed_household(&db);

    let result = commands::cmd_rules_list(&db, household_id, false);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_rules_list_unknown_household() {
    let (_dir, _path, db) = setup_test_db();

    let result = commands::cmd_rules_list(&db, 999, false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

#[test]
fn test_cmd_rules_list_with_rules() {
    let (_dir, _path, db) = setup_test_db();
    let (household_id, _) = seed_household(&db);
    divvy_core::rules::create_rule(&db, &merchant_rule(household_id, "Tesco", 1)).unwrap();
    let deactivated =
        divvy_core::rules::create_rule(&db, &merchant_rule(household_id, "Boots", 2)).unwrap();
    db.deactivate_rule(deactivated.rule.id).unwrap();

    assert!(commands::cmd_rules_list(&db, household_id, false).is_ok());
    assert!(commands::cmd_rules_list(&db, household_id, true).is_ok());
}

// ========== Recategorize Command Tests ==========

#[tokio::test]
async fn test_cmd_recategorize_applies_rules() {
    let (_dir, path, db) = setup_test_db();
    let (household_id, account_id) = seed_household(&db);
    let matching = seed_transaction(&db, account_id, "Tesco", -42.0);
    let non_matching = seed_transaction(&db, account_id, "Corner Shop", -5.0);
    divvy_core::rules::create_rule(&db, &merchant_rule(household_id, "Tesco", 1)).unwrap();

    commands::cmd_recategorize(&path, household_id).await.unwrap();

    let tx = db.get_transaction(matching).unwrap().unwrap();
    assert!(tx.splitting_rule_id.is_some());
    assert_eq!(tx.confidence_score, Some(100));

    let tx = db.get_transaction(non_matching).unwrap().unwrap();
    assert!(tx.splitting_rule_id.is_none());
}

#[tokio::test]
async fn test_cmd_recategorize_skips_overridden() {
    let (_dir, path, db) = setup_test_db();
    let (household_id, account_id) = seed_household(&db);
    let overridden = seed_transaction(&db, account_id, "Tesco", -10.0);
    db.apply_override(overridden, "alice@example.com", false, None, None, None)
        .unwrap();
    divvy_core::rules::create_rule(&db, &merchant_rule(household_id, "Tesco", 1)).unwrap();

    commands::cmd_recategorize(&path, household_id).await.unwrap();

    let tx = db.get_transaction(overridden).unwrap().unwrap();
    assert!(tx.manual_override);
    assert!(tx.splitting_rule_id.is_none());
}

#[tokio::test]
async fn test_cmd_recategorize_unknown_household() {
    let (_dir, path, _db) = setup_test_db();

    let result = commands::cmd_recategorize(&path, 999).await;
    assert!(result.is_err());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly ten", 11), "exactly ten");
    assert_eq!(truncate("much too long to fit", 10), "much to...");
}
