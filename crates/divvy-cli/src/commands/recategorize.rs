//! Batch re-categorization command

use std::path::Path;

use anyhow::{Context, Result};
use divvy_core::engine::CategorizationEngine;

use super::open_db;

/// Re-run a household's active rules over every transaction that has not
/// been manually overridden, printing the batch summary.
pub async fn cmd_recategorize(db_path: &Path, household_id: i64) -> Result<()> {
    let db = open_db(db_path)?;

    db.get_household(household_id)
        .context("Failed to load household")?
        .with_context(|| format!("Household {} not found", household_id))?;

    println!("🔄 Recategorizing household {}...", household_id);

    let transactions = db
        .list_recategorizable(household_id)
        .context("Failed to load transactions")?;
    let rules = db
        .active_rules(household_id)
        .context("Failed to load rules")?;

    println!("   Transactions: {}", transactions.len());
    println!("   Active rules: {}", rules.len());

    let engine = CategorizationEngine::new(db);
    let outcome = engine
        .apply_rules_to_transactions(transactions, rules, household_id)
        .await
        .context("Batch categorization failed")?;

    let failures: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.error.is_some())
        .collect();

    println!();
    println!("📊 Recategorization Results");
    println!("   ─────────────────────────────");
    println!("   Total processed: {}", outcome.total);
    println!("   ✅ Categorized: {}", outcome.categorized);
    println!("   ❔ Uncategorized: {}", outcome.uncategorized);
    if !failures.is_empty() {
        println!("   ⚠️  Failed: {}", failures.len());
        for item in failures {
            if let Some(err) = &item.error {
                println!("      #{}: {}", item.transaction_id, err);
            }
        }
    }

    Ok(())
}
