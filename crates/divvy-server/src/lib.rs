//! Divvy Web Server
//!
//! Axum-based REST API for the Divvy expense splitting engine.
//!
//! Caller identity arrives in the `x-divvy-user-email` header, set by the
//! authenticating reverse proxy upstream of this service; the engine itself
//! only checks household membership and account ownership. Error responses
//! are sanitized: internal detail is logged, clients get a generic message.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use divvy_core::db::Database;
use divvy_core::engine::CategorizationEngine;

mod handlers;


/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header carrying the authenticated caller's email, set by the upstream
/// proxy
pub const USER_EMAIL_HEADER: &str = "x-divvy-user-email";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub engine: CategorizationEngine,
    pub config: ServerConfig,
}

/// Extract the caller's email from request headers.
pub fn get_user_email(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "local-dev".to_string())
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let engine = CategorizationEngine::new(db.clone());
    let state = Arc::new(AppState {
        db,
        engine,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Identity echo (lets UIs confirm who the proxy says they are)
        .route("/me", get(handlers::get_me))
        // Rules
        .route(
            "/households/:id/rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        // Manual-review queue
        .route(
            "/households/:id/transactions/uncategorized",
            get(handlers::list_uncategorized),
        )
        // Batch categorization
        .route(
            "/households/:id/transactions/batch",
            post(handlers::batch_categorize),
        )
        // Overrides
        .route(
            "/transactions/:id/override",
            post(handlers::override_transaction),
        )
        .route(
            "/transactions/:id/overrides",
            get(handlers::list_overrides),
        )
        // Split validation
        .route(
            "/transactions/:id/validate-split",
            post(handlers::validate_split),
        )
        .route("/health", get(handlers::health))
        .with_state(state);

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);
    for origin in &config.allowed_origins {
        if let Ok(value) = origin.parse::<HeaderValue>() {
            cors = cors.allow_origin(value);
        }
    }

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// API error with a sanitized client message
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error onto the API taxonomy: validation errors are 400 with
    /// field detail, missing rows 404, authorization failures 403, everything
    /// else a sanitized 500.
    pub fn from_core(err: divvy_core::Error) -> Self {
        use divvy_core::Error;
        match err {
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Forbidden(msg) => Self::forbidden(&msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
