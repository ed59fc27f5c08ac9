// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - health.rs: Health check endpoint
// - messages.rs: Message CRUD endpoints
// - extractors.rs: Custom Axum extractors (bearer token)
//
// ============================================================================

pub mod extractors;
mod health;
mod messages;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health (unauthenticated)
        .route("/health", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Messages
        .route("/api/v1/messages", post(messages::send_message))
        // GET takes a peer id, PATCH/DELETE take a message id
        .route(
            "/api/v1/messages/:id",
            get(messages::get_messages)
                .patch(messages::change_message)
                .delete(messages::delete_message),
        )
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(app_context)
}
