// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST   /api/v1/messages           - Send a direct message
// - GET    /api/v1/messages/:peer_id  - Conversation history with a peer
// - PATCH  /api/v1/messages/:id       - Edit a sent message
// - DELETE /api/v1/messages/:id       - Delete a sent message
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::BearerToken;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeMessageRequest {
    pub content: String,
}

/// POST /api/v1/messages
pub async fn send_message(
    State(app_context): State<Arc<AppContext>>,
    BearerToken(token): BearerToken,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_context
        .service
        .send_message(&token, request.receiver_id, &request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages/:peer_id
pub async fn get_messages(
    State(app_context): State<Arc<AppContext>>,
    BearerToken(token): BearerToken,
    Path(peer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let messages = app_context.service.get_messages(&token, peer_id).await?;
    let count = messages.len();

    Ok(Json(json!({
        "messages": messages,
        "count": count,
    })))
}

/// PATCH /api/v1/messages/:id
pub async fn change_message(
    State(app_context): State<Arc<AppContext>>,
    BearerToken(token): BearerToken,
    Path(message_id): Path<Uuid>,
    Json(request): Json<ChangeMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_context
        .service
        .change_message(&token, message_id, &request.content)
        .await?;

    Ok(Json(message))
}

/// DELETE /api/v1/messages/:id
pub async fn delete_message(
    State(app_context): State<Arc<AppContext>>,
    BearerToken(token): BearerToken,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_context
        .service
        .delete_message(&token, message_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
