//! Override handler: audited manual corrections to automatic categorization
//!
//! An override is terminal for the automatic pipeline: the engine never
//! re-applies rules to an overridden transaction. Every override leaves
//! `confidence_score = 100`, `manual_override = true`, one immutable audit
//! record, and a best-effort `overridden` feedback row.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::feedback;
use crate::models::{NewRuleFeedback, Transaction, UserAction};
use crate::split;

/// A user-initiated correction.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRequest {
    pub is_shared_expense: bool,
    /// Required when sharing a transaction that was not already shared
    #[serde(default)]
    pub shared_with_household_id: Option<i64>,
    #[serde(default)]
    pub split_percentage: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Apply a manual override on behalf of `caller`.
///
/// The caller must own the transaction's account or belong to the household
/// the transaction is shared with. The audit insert and transaction update
/// commit atomically; feedback is recorded afterwards and never fails the
/// override.
pub fn override_transaction(
    db: &Database,
    transaction_id: i64,
    caller: &str,
    request: &OverrideRequest,
) -> Result<Transaction> {
    let transaction = db
        .get_transaction(transaction_id)?
        .ok_or_else(|| Error::NotFound(format!("Transaction {} not found", transaction_id)))?;

    if !db.can_access_transaction(caller, &transaction)? {
        return Err(Error::Forbidden(format!(
            "{} may not modify transaction {}",
            caller, transaction_id
        )));
    }

    let shared_with = resolve_shared_household(db, &transaction, request)?;

    if let Some(split_map) = &request.split_percentage {
        split::validate_split_percentages(split_map)?;
        if let Some(household_id) = shared_with {
            db.assert_household_members(household_id, split_map.keys())?;
        }
    }

    let updated = db.apply_override(
        transaction_id,
        caller,
        request.is_shared_expense,
        shared_with,
        request.split_percentage.as_ref(),
        request.reason.as_deref(),
    )?;

    info!(
        transaction_id,
        caller,
        is_shared_expense = request.is_shared_expense,
        "manual override applied"
    );

    let mut details: HashMap<String, serde_json::Value> = HashMap::from([
        (
            "old_is_shared_expense".to_string(),
            transaction.is_shared_expense.into(),
        ),
        (
            "new_is_shared_expense".to_string(),
            request.is_shared_expense.into(),
        ),
    ]);
    if let Some(reason) = &request.reason {
        details.insert("reason".to_string(), reason.clone().into());
    }

    feedback::record_rule_feedback_best_effort(
        db,
        &NewRuleFeedback {
            transaction_id,
            rule_id: transaction.splitting_rule_id,
            household_id: shared_with.or(transaction.shared_with_household_id),
            user_action: UserAction::Overridden,
            original_confidence_score: transaction.confidence_score,
            override_details: Some(details),
        },
    );

    Ok(updated)
}

/// Which household a shared override targets: the explicit request value,
/// falling back to the transaction's current sharing.
fn resolve_shared_household(
    db: &Database,
    transaction: &Transaction,
    request: &OverrideRequest,
) -> Result<Option<i64>> {
    if !request.is_shared_expense {
        return Ok(None);
    }

    let household_id = request
        .shared_with_household_id
        .or(transaction.shared_with_household_id)
        .ok_or_else(|| {
            Error::InvalidData(
                "shared_with_household_id is required when marking a transaction shared"
                    .to_string(),
            )
        })?;

    if db.get_household(household_id)?.is_none() {
        return Err(Error::NotFound(format!(
            "Household {} not found",
            household_id
        )));
    }

    Ok(Some(household_id))
}
