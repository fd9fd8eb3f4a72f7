//! Rule listing command

use anyhow::{Context, Result};
use divvy_core::db::Database;
use divvy_core::models::{RuleOrder, SplittingRule};
use divvy_core::scoring;

use super::truncate;

pub fn cmd_rules_list(db: &Database, household_id: i64, include_inactive: bool) -> Result<()> {
    db.get_household(household_id)
        .context("Failed to load household")?
        .with_context(|| format!("Household {} not found", household_id))?;

    let rules =
        divvy_core::rules::list_rules(db, household_id, !include_inactive, RuleOrder::Priority)?;

    if rules.is_empty() {
        println!("No rules defined for household {}.", household_id);
        println!("Create one via POST /api/households/{}/rules", household_id);
        return Ok(());
    }

    println!();
    println!("📋 Splitting Rules (household {})", household_id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:>4} │ {:20} │ {:16} │ {:>5} │ {}",
        "ID", "Pri", "Name", "Type", "Score", "Match"
    );
    println!("   ─────┼──────┼──────────────────────┼──────────────────┼───────┼────────────");

    for rule in &rules {
        println!(
            "   {:>4} │ {:>4} │ {:20} │ {:16} │ {:>5} │ {}{}",
            rule.id,
            rule.priority,
            truncate(&rule.rule_name, 20),
            rule.rule_type.as_str(),
            scoring::confidence_score(rule),
            truncate(&describe_match(rule), 30),
            if rule.is_active { "" } else { "  (inactive)" }
        );
    }

    Ok(())
}

/// One-line description of what a rule matches on.
fn describe_match(rule: &SplittingRule) -> String {
    if let Some(pattern) = &rule.merchant_pattern {
        return pattern.clone();
    }
    if let Some(category) = &rule.category_match {
        return category.clone();
    }
    match (rule.min_amount, rule.max_amount) {
        (Some(min), Some(max)) => format!("{:.2}..{:.2}", min, max),
        (Some(min), None) => format!(">= {:.2}", min),
        (None, Some(max)) => format!("<= {:.2}", max),
        (None, None) => "any".to_string(),
    }
}
