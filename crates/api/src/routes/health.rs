//! Health check route.

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;

use crate::AppState;

/// Creates the health routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET `/health` - Liveness probe.
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
