//! Categorization engine: matcher + scorer orchestration over single
//! transactions and batches
//!
//! The batch path bounds concurrent load on the database by working in fixed
//! chunks; within a chunk each transaction runs on its own blocking task and
//! its outcome is captured independently, so one failing item never aborts or
//! masks its chunk-mates.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{Database, UncategorizedFilter};
use crate::error::Result;
use crate::matcher;
use crate::models::{SplittingRule, Transaction};
use crate::scoring;

/// Transactions categorized concurrently per chunk. Bounds in-flight work
/// against the database; results are identical regardless of chunk size.
pub const CATEGORIZE_CHUNK_SIZE: usize = 50;

/// Result of applying rules to one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizationOutcome {
    pub transaction_id: i64,
    pub rule_applied: bool,
    pub rule_id: Option<i64>,
    pub confidence_score: i64,
    pub is_shared_expense: bool,
    pub shared_with_household_id: Option<i64>,
}

impl CategorizationOutcome {
    /// No rule was applied: either nothing matched, or the row is pinned by
    /// a manual override. Nothing is written.
    fn uncategorized(transaction_id: i64) -> Self {
        Self {
            transaction_id,
            rule_applied: false,
            rule_id: None,
            confidence_score: 0,
            is_shared_expense: false,
            shared_with_household_id: None,
        }
    }
}

/// Per-item entry in a batch result. `error` is set when this item failed;
/// its siblings are unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub transaction_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CategorizationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a batch categorization run.
///
/// `categorized + uncategorized == total` always holds; failed items count
/// as uncategorized.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    pub results: Vec<BatchItemResult>,
}

/// Orchestrates matching, scoring, and persistence.
#[derive(Clone)]
pub struct CategorizationEngine {
    db: Database,
}

impl CategorizationEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Apply the first matching rule to a transaction and persist the result.
    ///
    /// `rules` must be the household's active rules in evaluation order (see
    /// `Database::active_rules`). An override that lands between the caller's
    /// read and this write wins: the store refuses the update and the outcome
    /// reports no rule applied.
    pub fn apply_rule_to_transaction(
        &self,
        transaction: &Transaction,
        rules: &[SplittingRule],
        household_id: i64,
    ) -> Result<CategorizationOutcome> {
        let compiled = matcher::compile_rules(rules.iter().cloned())?;
        self.apply_compiled(transaction, &compiled, household_id)
    }

    fn apply_compiled(
        &self,
        transaction: &Transaction,
        rules: &[matcher::CompiledRule],
        household_id: i64,
    ) -> Result<CategorizationOutcome> {
        let Some(rule) = matcher::find_matching_rule(transaction, rules) else {
            debug!(
                transaction_id = transaction.id,
                household_id, "no rule matched; leaving uncategorized"
            );
            return Ok(CategorizationOutcome::uncategorized(transaction.id));
        };

        let confidence = scoring::confidence_score(rule);

        // A non-empty split marks the transaction shared with the rule's
        // household; otherwise it stays personal.
        let is_shared = rule.has_split();
        let shared_with = is_shared.then_some(rule.household_id);

        let written = self.db.record_categorization(
            transaction.id,
            rule.id,
            is_shared,
            shared_with,
            rule.split_percentage.as_ref(),
            confidence,
        )?;

        if !written {
            debug!(
                transaction_id = transaction.id,
                rule_id = rule.id,
                "manual override landed since read; leaving as overridden"
            );
            return Ok(CategorizationOutcome::uncategorized(transaction.id));
        }

        debug!(
            transaction_id = transaction.id,
            rule_id = rule.id,
            confidence,
            is_shared,
            "rule applied"
        );

        Ok(CategorizationOutcome {
            transaction_id: transaction.id,
            rule_applied: true,
            rule_id: Some(rule.id),
            confidence_score: confidence,
            is_shared_expense: is_shared,
            shared_with_household_id: shared_with,
        })
    }

    /// Categorize a batch of transactions in chunks of
    /// [`CATEGORIZE_CHUNK_SIZE`], concurrently within each chunk.
    ///
    /// Rules are compiled once up front and shared across every item; a rule
    /// that fails to compile fails the whole batch before any write.
    pub async fn apply_rules_to_transactions(
        &self,
        transactions: Vec<Transaction>,
        rules: Vec<SplittingRule>,
        household_id: i64,
    ) -> Result<BatchOutcome> {
        let total = transactions.len();
        let rules = Arc::new(matcher::compile_rules(rules)?);
        let mut results = Vec::with_capacity(total);

        for chunk in transactions.chunks(CATEGORIZE_CHUNK_SIZE) {
            let mut handles = Vec::with_capacity(chunk.len());
            for transaction in chunk {
                let engine = self.clone();
                let rules = Arc::clone(&rules);
                let transaction = transaction.clone();
                let id = transaction.id;
                let handle = tokio::task::spawn_blocking(move || {
                    engine.apply_compiled(&transaction, &rules, household_id)
                });
                handles.push((id, handle));
            }

            // Settle every item: an Err (or a panicked task) becomes that
            // item's failure and nothing more.
            for (transaction_id, handle) in handles {
                let item = match handle.await {
                    Ok(Ok(outcome)) => BatchItemResult {
                        transaction_id,
                        outcome: Some(outcome),
                        error: None,
                    },
                    Ok(Err(e)) => {
                        warn!(transaction_id, error = %e, "categorization failed");
                        BatchItemResult {
                            transaction_id,
                            outcome: None,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(e) => {
                        warn!(transaction_id, error = %e, "categorization task aborted");
                        BatchItemResult {
                            transaction_id,
                            outcome: None,
                            error: Some(format!("categorization task aborted: {}", e)),
                        }
                    }
                };
                results.push(item);
            }
        }

        let categorized = results
            .iter()
            .filter(|r| r.outcome.as_ref().is_some_and(|o| o.rule_applied))
            .count();

        Ok(BatchOutcome {
            total,
            categorized,
            uncategorized: total - categorized,
            results,
        })
    }

    /// Manual-review queue for a household.
    pub fn get_uncategorized_transactions(
        &self,
        household_id: i64,
        filter: &UncategorizedFilter,
    ) -> Result<Vec<Transaction>> {
        self.db.list_uncategorized(household_id, filter)
    }
}
