//! Manual override handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{get_user_email, AppError, AppState};
use divvy_core::models::{Transaction, TransactionOverride};
use divvy_core::overrides::{self, OverrideRequest};

/// POST /api/transactions/:id/override - Apply an audited manual override
pub async fn override_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<Transaction>, AppError> {
    let caller = get_user_email(&headers);

    let updated = overrides::override_transaction(&state.db, transaction_id, &caller, &req)
        .map_err(AppError::from_core)?;

    Ok(Json(updated))
}

/// GET /api/transactions/:id/overrides - Audit trail for a transaction
pub async fn list_overrides(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<TransactionOverride>>, AppError> {
    let caller = get_user_email(&headers);

    let transaction = state
        .db
        .get_transaction(transaction_id)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    let allowed = state
        .db
        .can_access_transaction(&caller, &transaction)
        .map_err(AppError::from_core)?;
    if !allowed {
        return Err(AppError::forbidden("Not allowed to view this transaction"));
    }

    let records = state
        .db
        .list_overrides(transaction_id)
        .map_err(AppError::from_core)?;
    Ok(Json(records))
}
