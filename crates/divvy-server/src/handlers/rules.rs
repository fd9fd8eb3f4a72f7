//! Splitting rule handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{get_user_email, AppError, AppState};
use divvy_core::engine::CategorizationEngine;
use divvy_core::models::{NewSplittingRule, RuleOrder, RuleType, SplittingRule};
use divvy_core::rules::CreatedRule;

/// Query parameters for GET /api/households/:id/rules
#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    #[serde(default)]
    pub active_only: Option<bool>,
    #[serde(default)]
    pub order_by: Option<String>,
}

/// GET /api/households/:id/rules - List a household's rules
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<i64>,
    Query(query): Query<ListRulesQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<SplittingRule>>, AppError> {
    let caller = get_user_email(&headers);
    require_member(&state, household_id, &caller)?;

    let order = match query.order_by.as_deref() {
        None => RuleOrder::Priority,
        Some(s) => s
            .parse()
            .map_err(|_| AppError::bad_request("Invalid order_by. Valid: priority, created_at"))?,
    };

    let rules = divvy_core::rules::list_rules(
        &state.db,
        household_id,
        query.active_only.unwrap_or(false),
        order,
    )
    .map_err(AppError::from_core)?;

    Ok(Json(rules))
}

/// Request body for creating a rule
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub rule_name: String,
    pub rule_type: RuleType,
    pub priority: i64,
    #[serde(default)]
    pub merchant_pattern: Option<String>,
    #[serde(default)]
    pub category_match: Option<String>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub split_percentage: Option<HashMap<String, f64>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub apply_to_existing_transactions: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/households/:id/rules - Create a rule, returning conflict
/// warnings (non-blocking)
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Path(household_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<CreatedRule>, AppError> {
    let caller = get_user_email(&headers);
    require_member(&state, household_id, &caller)?;

    let new_rule = NewSplittingRule {
        household_id,
        rule_name: req.rule_name,
        rule_type: req.rule_type,
        priority: req.priority,
        merchant_pattern: req.merchant_pattern,
        category_match: req.category_match,
        min_amount: req.min_amount,
        max_amount: req.max_amount,
        split_percentage: req.split_percentage,
        is_active: req.is_active,
        apply_to_existing_transactions: req.apply_to_existing_transactions,
        created_by: caller,
    };

    let created = divvy_core::rules::create_rule(&state.db, &new_rule)
        .map_err(AppError::from_core)?;

    // The one-shot backfill over existing transactions runs detached; the
    // creation response doesn't wait for it.
    if created.rule.apply_to_existing_transactions && created.rule.is_active {
        let engine = state.engine.clone();
        let rule_id = created.rule.id;
        tokio::spawn(async move {
            backfill_household(engine, household_id, rule_id).await;
        });
    }

    Ok(Json(created))
}

/// Re-run the household's active rules over every transaction that has not
/// been manually overridden.
async fn backfill_household(engine: CategorizationEngine, household_id: i64, rule_id: i64) {
    let db = engine.db().clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let transactions = db.list_recategorizable(household_id)?;
        let rules = db.active_rules(household_id)?;
        Ok::<_, divvy_core::Error>((transactions, rules))
    })
    .await;

    let (transactions, rules) = match loaded {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            warn!(household_id, rule_id, error = %e, "backfill load failed");
            return;
        }
        Err(e) => {
            warn!(household_id, rule_id, error = %e, "backfill task aborted");
            return;
        }
    };

    let outcome = match engine
        .apply_rules_to_transactions(transactions, rules, household_id)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(household_id, rule_id, error = %e, "backfill batch failed");
            return;
        }
    };
    info!(
        household_id,
        rule_id,
        total = outcome.total,
        categorized = outcome.categorized,
        "backfill after rule creation complete"
    );
}

pub(super) fn require_member(
    state: &AppState,
    household_id: i64,
    caller: &str,
) -> Result<(), AppError> {
    let is_member = state
        .db
        .is_household_member(household_id, caller)
        .map_err(AppError::from_core)?;
    if !is_member {
        return Err(AppError::forbidden("Not a member of this household"));
    }
    Ok(())
}
