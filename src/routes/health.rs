// ============================================================================
// Health Routes
// ============================================================================
//
// Endpoints:
// - GET /health       - Overall health (database reachable)
// - GET /health/live  - Liveness (process up)
// - GET /health/ready - Readiness (database reachable)
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /health and /health/ready
pub async fn readiness(State(app_context): State<Arc<AppContext>>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&app_context.db_pool).await {
        Ok(_) => (StatusCode::OK, axum::Json(json!({"status": "ok"}))),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(json!({"status": "unavailable"})),
            )
        }
    }
}
