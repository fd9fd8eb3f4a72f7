//! Transaction categorization handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::rules::require_member;
use crate::{get_user_email, AppError, AppState, MAX_PAGE_LIMIT};
use divvy_core::db::UncategorizedFilter;
use divvy_core::models::{NewRuleFeedback, Transaction, UserAction};
use divvy_core::overrides::OverrideRequest;
use divvy_core::{feedback, overrides};

/// Query parameters for GET /api/households/:id/transactions/uncategorized
#[derive(Debug, Deserialize)]
pub struct UncategorizedQuery {
    #[serde(default)]
    pub min_confidence: Option<i64>,
    #[serde(default)]
    pub max_confidence: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /api/households/:id/transactions/uncategorized - Manual-review queue
pub async fn list_uncategorized(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<i64>,
    Query(query): Query<UncategorizedQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let caller = get_user_email(&headers);
    require_member(&state, household_id, &caller)?;

    let filter = UncategorizedFilter {
        min_confidence: query.min_confidence,
        max_confidence: query.max_confidence,
        limit: query.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT),
        offset: query.offset.unwrap_or(0).max(0),
    };

    let transactions = state
        .engine
        .get_uncategorized_transactions(household_id, &filter)
        .map_err(AppError::from_core)?;

    Ok(Json(transactions))
}

/// What a batch operation should do with the listed transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    /// Force-mark every transaction personal with a manual override
    MarkPersonal,
    /// Apply one specified active rule to every transaction
    ApplyRule,
}

/// Request body for POST /api/households/:id/transactions/batch
#[derive(Debug, Deserialize)]
pub struct BatchCategorizeRequest {
    pub transaction_ids: Vec<i64>,
    pub action: BatchAction,
    #[serde(default)]
    pub rule_id: Option<i64>,
}

/// Per-item outcome in a batch response.
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    pub transaction_id: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch response: counts always sum to the number of listed transactions.
#[derive(Debug, Serialize)]
pub struct BatchCategorizeResponse {
    pub success_count: usize,
    pub failed_count: usize,
    pub details: Vec<BatchDetail>,
}

/// POST /api/households/:id/transactions/batch - Bulk categorization
///
/// Item failures never abort the batch; each listed transaction reports its
/// own outcome.
pub async fn batch_categorize(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<BatchCategorizeRequest>,
) -> Result<Json<BatchCategorizeResponse>, AppError> {
    let caller = get_user_email(&headers);
    require_member(&state, household_id, &caller)?;

    if req.transaction_ids.is_empty() {
        return Err(AppError::bad_request("transaction_ids must not be empty"));
    }

    let details = match req.action {
        BatchAction::MarkPersonal => mark_personal(&state, &caller, &req.transaction_ids),
        BatchAction::ApplyRule => {
            let rule_id = req
                .rule_id
                .ok_or_else(|| AppError::bad_request("rule_id is required for apply_rule"))?;
            apply_rule(&state, household_id, rule_id, &req.transaction_ids).await?
        }
    };

    let success_count = details.iter().filter(|d| d.success).count();
    Ok(Json(BatchCategorizeResponse {
        success_count,
        failed_count: details.len() - success_count,
        details,
    }))
}

/// Force-set every listed transaction personal via the audited override
/// path, recording `overridden` feedback for each.
fn mark_personal(state: &AppState, caller: &str, transaction_ids: &[i64]) -> Vec<BatchDetail> {
    let request = OverrideRequest {
        is_shared_expense: false,
        shared_with_household_id: None,
        split_percentage: None,
        reason: Some("bulk mark personal".to_string()),
    };

    transaction_ids
        .iter()
        .map(|&id| {
            match overrides::override_transaction(&state.db, id, caller, &request) {
                Ok(_) => BatchDetail {
                    transaction_id: id,
                    success: true,
                    error: None,
                },
                Err(e) => BatchDetail {
                    transaction_id: id,
                    success: false,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

/// Apply one active rule to every listed transaction through the engine's
/// chunked batch path, recording `accepted` feedback per categorized item.
async fn apply_rule(
    state: &AppState,
    household_id: i64,
    rule_id: i64,
    transaction_ids: &[i64],
) -> Result<Vec<BatchDetail>, AppError> {
    let rule = state
        .db
        .get_rule(rule_id)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found("Rule not found"))?;
    if rule.household_id != household_id {
        return Err(AppError::not_found("Rule not found in this household"));
    }
    if !rule.is_active {
        return Err(AppError::bad_request("Rule is not active"));
    }

    // Resolve ids up front; unknown, out-of-household, and already-overridden
    // transactions fail individually without touching their siblings.
    let mut eligible = Vec::new();
    let mut details: Vec<BatchDetail> = Vec::with_capacity(transaction_ids.len());
    for &id in transaction_ids {
        let tx = match state.db.get_transaction(id).map_err(AppError::from_core)? {
            None => {
                details.push(BatchDetail {
                    transaction_id: id,
                    success: false,
                    error: Some("Transaction not found".to_string()),
                });
                continue;
            }
            Some(tx) => tx,
        };
        // The rule is household-scoped, so ids pointing at accounts outside
        // the household are rejected rather than silently categorized
        let in_household = state
            .db
            .transaction_in_household(household_id, &tx)
            .map_err(AppError::from_core)?;
        if !in_household {
            details.push(BatchDetail {
                transaction_id: id,
                success: false,
                error: Some("Transaction does not belong to this household".to_string()),
            });
        } else if tx.manual_override {
            details.push(BatchDetail {
                transaction_id: id,
                success: false,
                error: Some("Transaction has a manual override".to_string()),
            });
        } else {
            eligible.push(tx);
        }
    }

    let outcome = state
        .engine
        .apply_rules_to_transactions(eligible, vec![rule.clone()], household_id)
        .await
        .map_err(AppError::from_core)?;

    for item in outcome.results {
        let (success, error) = match (&item.outcome, &item.error) {
            (Some(o), None) if o.rule_applied => {
                feedback::record_rule_feedback_best_effort(
                    &state.db,
                    &NewRuleFeedback {
                        transaction_id: item.transaction_id,
                        rule_id: Some(rule_id),
                        household_id: Some(household_id),
                        user_action: UserAction::Accepted,
                        original_confidence_score: Some(o.confidence_score),
                        override_details: None,
                    },
                );
                (true, None)
            }
            (Some(_), None) => (false, Some("Rule did not match transaction".to_string())),
            (_, err) => (false, err.clone()),
        };
        details.push(BatchDetail {
            transaction_id: item.transaction_id,
            success,
            error,
        });
    }

    Ok(details)
}
