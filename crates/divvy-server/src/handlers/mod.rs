//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod overrides;
pub mod rules;
pub mod splits;
pub mod transactions;

// Re-export all handlers for use in router
pub use overrides::*;
pub use rules::*;
pub use splits::*;
pub use transactions::*;

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use crate::{get_user_email, AppState};

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/me - Echo the caller identity the proxy supplied
pub async fn get_me(
    State(_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "email": get_user_email(&headers) }))
}
