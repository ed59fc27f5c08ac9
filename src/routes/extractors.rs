// ============================================================================
// Axum Extractors
// ============================================================================
//
// Custom extractors for Axum routes:
// - BearerToken: Extracts the raw JWT from the Authorization header
//
// Token verification itself belongs to the service layer, which needs the
// raw token to attribute every operation to the caller. The extractor only
// enforces that a Bearer token is present and well-formed.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;

/// Extractor for the raw bearer token from the Authorization header
///
/// Usage:
/// ```rust,ignore
/// async fn handler(BearerToken(token): BearerToken, ...) -> Result<...> {
///     // pass `token` to the service layer
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for BearerToken {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        extract_bearer_token(parts).map(BearerToken).map_err(|e| {
            tracing::warn!(error = %e, "Bearer token extraction failed");
            let body = json!({
                "error": e.user_message(),
                "code": e.error_code(),
            });
            (e.status_code(), axum::Json(body)).into_response()
        })
    }
}

fn extract_bearer_token(parts: &Parts) -> Result<String, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

    // Format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid Authorization header format".to_string()))?;

    if token.is_empty() {
        return Err(AppError::Auth("Empty bearer token".to_string()));
    }

    Ok(token.to_string())
}
