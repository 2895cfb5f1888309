//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::{AppState, middleware::auth::auth_middleware};

pub mod admin;
pub mod archive;
pub mod budgets;
pub mod coordination;
pub mod health;
pub mod moderation;
pub mod requests;
pub mod review;
pub mod revisions;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(budgets::routes())
        .merge(requests::routes())
        .merge(moderation::routes())
        .merge(coordination::routes())
        .merge(archive::routes())
        .merge(review::routes())
        .merge(revisions::routes())
        .merge(admin::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Renders a domain error as the canonical JSON error body.
///
/// Internal errors (5xx) are logged and replaced with a generic message so
/// database details never leak to clients.
pub(crate) fn error_response(status: u16, code: &str, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(code, message, "internal error");
        return (
            status,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred"
            })),
        )
            .into_response();
    }

    (
        status,
        Json(json!({
            "error": code.to_lowercase(),
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_client_error_keeps_message() {
        let response = error_response(404, "NOT_FOUND", "Budget 7 not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_response_server_error_is_masked() {
        let response = error_response(500, "DATABASE_ERROR", "connection refused");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_bad_status_falls_back() {
        let response = error_response(99, "weird", "odd");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
