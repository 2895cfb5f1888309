//! Moderator routes over assigned purchase requests.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::routes::requests::{
    CreateRequestBody, RequestResponse, parse_items, purchasing_error_response,
    request_to_response,
};
use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_core::purchasing::DecisionValue;
use bursar_db::repositories::purchasing::{ItemDecisionInput, PurchasingRepository};
use bursar_shared::Role;

/// Creates the moderator routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mod/requests", get(list_assigned))
        .route("/mod/requests", post(create_on_behalf))
        .route("/mod/requests/{request_id}/items", patch(set_decisions))
        .route("/mod/requests/{request_id}/send", post(send_request))
        .route("/mod/requests/{request_id}/revise", post(revise_request))
}

// ============================================================================
// Request Types
// ============================================================================

/// One per-item decision.
#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    /// Target item.
    pub item_id: i64,
    /// `needed` or `not-needed`.
    pub decision: String,
}

/// Batch of per-item decisions.
#[derive(Debug, Deserialize)]
pub struct DecisionBatchBody {
    /// The decisions.
    pub items: Vec<DecisionBody>,
}

/// Request body for creating a request on behalf of an author.
#[derive(Debug, Deserialize)]
pub struct CreateOnBehalfBody {
    /// The author the request belongs to.
    pub author_id: i64,
    /// The request's items.
    #[serde(flatten)]
    pub request: CreateRequestBody,
}

/// Request body for a revise.
#[derive(Debug, Deserialize)]
pub struct ReviseBody {
    /// Why the request is sent back.
    pub comment: String,
}

pub(crate) fn parse_decisions(
    items: Vec<DecisionBody>,
) -> Result<Vec<ItemDecisionInput>, axum::response::Response> {
    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        let Some(decision) = DecisionValue::parse(&item.decision) else {
            return Err(error_response(
                400,
                "INVALID_DECISION",
                "decision must be needed or not-needed",
            ));
        };
        parsed.push(ItemDecisionInput {
            item_id: item.item_id,
            decision,
        });
    }
    Ok(parsed)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/mod/requests` - Requests assigned to the moderator.
async fn list_assigned(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Moderator]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .list_for_moderator(auth.user_id(), auth.school_id())
        .await
    {
        Ok(requests) => {
            let data: Vec<RequestResponse> =
                requests.into_iter().map(request_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/mod/requests` - Create a request on behalf of an author.
///
/// The header starts `Decided` and every item pre-decided `needed`.
async fn create_on_behalf(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateOnBehalfBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Moderator]) {
        return response;
    }

    let input = match parse_items(payload.request.items) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .create_request(payload.author_id, auth.name(), input, true)
        .await
    {
        Ok(request) => {
            (StatusCode::CREATED, Json(request_to_response(request))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// PATCH `/mod/requests/{request_id}/items` - Batch per-item decisions.
async fn set_decisions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<DecisionBatchBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Moderator]) {
        return response;
    }

    let decisions = match parse_decisions(payload.items) {
        Ok(decisions) => decisions,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .set_mod_decisions(request_id, auth.user_id(), auth.school_id(), decisions)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/mod/requests/{request_id}/send` - Forward to the coordinator.
async fn send_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Moderator]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .send_request(request_id, auth.user_id(), auth.school_id(), auth.name())
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/mod/requests/{request_id}/revise` - Send back to the author.
async fn revise_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<ReviseBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Moderator]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .revise_by_moderator(
            request_id,
            auth.user_id(),
            auth.school_id(),
            auth.name(),
            &payload.comment,
        )
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}
