//! Muhasebeci (accountant archiver) routes.
//!
//! The archiver sees only approved requests within their school and may only
//! mark them printed.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::routes::requests::{
    RequestResponse, purchasing_error_response, request_to_response,
};
use crate::{AppState, middleware::AuthUser};
use bursar_db::repositories::purchasing::PurchasingRepository;
use bursar_shared::Role;

/// Creates the archiver routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/archive/requests", get(list_approved))
        .route("/archive/requests/{request_id}/printed", post(set_printed))
}

/// GET `/archive/requests` - Approved requests within the caller's school.
async fn list_approved(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Muhasebeci]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.list_approved_for_school(auth.school_id()).await {
        Ok(requests) => {
            let data: Vec<RequestResponse> =
                requests.into_iter().map(request_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/archive/requests/{request_id}/printed` - Mark printed.
async fn set_printed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Muhasebeci]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.set_printed(request_id, auth.school_id()).await {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}
