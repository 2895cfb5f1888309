//! Coordinator routes: school-wide listing, decisions, approval, revise.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::routes::moderation::{DecisionBatchBody, parse_decisions};
use crate::routes::requests::{
    RequestResponse, purchasing_error_response, request_to_response,
};
use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_db::repositories::purchasing::PurchasingRepository;
use bursar_shared::Role;

/// Creates the coordinator routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coordinator/requests", get(list_school_requests))
        .route(
            "/coordinator/requests/{request_id}/items",
            patch(set_decisions),
        )
        .route("/coordinator/requests/{request_id}/approve", post(approve))
        .route("/coordinator/requests/{request_id}/revise", post(revise))
}

/// Request body for a coordinator revise.
#[derive(Debug, Deserialize)]
pub struct CoordinatorReviseBody {
    /// Why the request is sent back down.
    pub comment: String,
}

/// GET `/coordinator/requests` - Requests authored in the caller's school.
async fn list_school_requests(
    State(state): State<AppState>,
    auth: AuthUser,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Coordinator]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.list_for_school(auth.school_id()).await {
        Ok(requests) => {
            let data: Vec<RequestResponse> =
                requests.into_iter().map(request_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// PATCH `/coordinator/requests/{request_id}/items` - Batch decisions.
async fn set_decisions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<DecisionBatchBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Coordinator]) {
        return response;
    }

    let decisions = match parse_decisions(payload.items) {
        Ok(decisions) => decisions,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .set_coordinator_decisions(request_id, auth.school_id(), decisions)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/coordinator/requests/{request_id}/approve` - Approve a forwarded
/// request and mint its verification token.
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Coordinator]) {
        return response;
    }

    let token = match state
        .jwt_service
        .mint_verification_token(request_id, Utc::now())
    {
        Ok(token) => token,
        Err(e) => {
            return error_response(500, "TOKEN_MINT_FAILED", &e.to_string());
        }
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .approve(request_id, auth.school_id(), auth.name(), token.clone())
        .await
    {
        Ok(request) => {
            info!(request_id, "request approved by coordinator");
            (
                StatusCode::OK,
                Json(json!({
                    "request": request_to_response(request),
                    "verification_token": token,
                })),
            )
                .into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/coordinator/requests/{request_id}/revise` - Send back down.
async fn revise(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<CoordinatorReviseBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Coordinator]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .revise_by_coordinator(request_id, auth.school_id(), auth.name(), &payload.comment)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}
