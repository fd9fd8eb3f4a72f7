//! Manual split validation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{get_user_email, AppError, AppState};
use divvy_core::split::{self, SplitInput, SplitValidation};

/// POST /api/transactions/:id/validate-split - Validate a proposed manual
/// split against the transaction total
///
/// Always responds 200; the verdict lives in the body so UIs can surface the
/// reason inline.
pub async fn validate_split(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<i64>,
    headers: HeaderMap,
    Json(input): Json<SplitInput>,
) -> Result<Json<SplitValidation>, AppError> {
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

    Ok(Json(split::validate_split_transaction(&transaction, &input)))
}
