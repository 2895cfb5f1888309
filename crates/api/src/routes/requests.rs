//! Purchase request routes for authors, plus token verification.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_core::purchasing::PurchasingError;
use bursar_db::entities::purchasing_requests;
use bursar_db::repositories::purchasing::{
    CreateRequestInput, CreateRequestItemInput, PurchasingRepository, RequestWithItems,
};
use bursar_shared::Role;

/// Creates the author request routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests", get(list_requests))
        .route("/requests/{request_id}", get(get_request))
        .route("/requests/{request_id}", patch(update_request))
        .route("/requests/{request_id}", delete(delete_request))
        .route("/requests/{request_id}/verify", get(verify_request))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for one request item.
#[derive(Debug, Deserialize)]
pub struct RequestItemBody {
    /// Item name.
    pub item_name: String,
    /// Requested quantity.
    pub quantity: String,
    /// Unit label.
    pub unit: String,
    /// Unit price.
    pub unit_price: String,
    /// Item description.
    pub description: Option<String>,
}

/// Request body for creating or replacing a request.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    /// The request's items.
    pub items: Vec<RequestItemBody>,
}

/// Query string for token verification.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    /// The verification token handed out at approval.
    pub token: String,
}

/// Response for a request header.
#[derive(Debug, Serialize)]
pub struct RequestResponse {
    /// Request ID.
    pub request_id: i64,
    /// Author.
    pub user_id: i64,
    /// Status.
    pub status: String,
    /// Moderator aggregate status.
    pub mod_status: Option<String>,
    /// Coordinator aggregate status.
    pub coordinator_status: Option<String>,
    /// Moderator revise comment.
    pub revise_comment: Option<String>,
    /// Coordinator revise comment.
    pub revise_comment_by_coordinator: Option<String>,
    /// Sum over qualifying items, two fractional digits.
    pub total_amount: String,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
    /// Whether the archiver printed it.
    pub is_printed: bool,
}

pub(crate) fn request_to_response(request: purchasing_requests::Model) -> RequestResponse {
    RequestResponse {
        request_id: request.request_id,
        user_id: request.user_id,
        status: request.status,
        mod_status: request.mod_status,
        coordinator_status: request.coordinator_status,
        revise_comment: request.revise_comment,
        revise_comment_by_coordinator: request.revise_comment_by_coordinator,
        total_amount: format!("{:.2}", request.total_amount),
        created_at: request.created_at.to_rfc3339(),
        updated_at: request.updated_at.to_rfc3339(),
        is_printed: request.is_printed,
    }
}

pub(crate) fn detail_response(detail: RequestWithItems) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "request": request_to_response(detail.request),
            "items": detail.items,
            "routes": detail.routes,
        })),
    )
        .into_response()
}

pub(crate) fn parse_items(
    items: Vec<RequestItemBody>,
) -> Result<CreateRequestInput, axum::response::Response> {
    if items.is_empty() {
        return Err(error_response(
            400,
            "ITEMS_REQUIRED",
            "At least one item is required",
        ));
    }

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        if item.item_name.trim().is_empty() {
            return Err(error_response(400, "ITEM_NAME_REQUIRED", "Item name is required"));
        }
        let (quantity, unit_price) =
            match (parse_amount(&item.quantity), parse_amount(&item.unit_price)) {
                (Ok(q), Ok(p)) => (q, p),
                _ => {
                    return Err(error_response(
                        400,
                        "INVALID_AMOUNT",
                        "Invalid quantity or unit price",
                    ));
                }
            };
        parsed.push(CreateRequestItemInput {
            item_name: item.item_name,
            quantity,
            unit: item.unit,
            unit_price,
            description: item.description,
        });
    }

    Ok(CreateRequestInput { items: parsed })
}

#[allow(clippy::result_unit_err)]
fn parse_amount(s: &str) -> Result<Decimal, ()> {
    match Decimal::from_str(s) {
        Ok(d) if d >= Decimal::ZERO => Ok(d),
        _ => Err(()),
    }
}

pub(crate) fn purchasing_error_response(e: &PurchasingError) -> axum::response::Response {
    error_response(e.status_code(), e.error_code(), &e.to_string())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/requests` - Create a purchase request.
async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateRequestBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    let input = match parse_items(payload.items) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .create_request(auth.user_id(), auth.name(), input, false)
        .await
    {
        Ok(request) => {
            (StatusCode::CREATED, Json(request_to_response(request))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// GET `/requests` - List the caller's requests.
async fn list_requests(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = PurchasingRepository::new((*state.db).clone());

    match repo.list_for_author(auth.user_id()).await {
        Ok(requests) => {
            let data: Vec<RequestResponse> =
                requests.into_iter().map(request_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// GET `/requests/{request_id}` - Read one request with items and routes.
async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    let repo = PurchasingRepository::new((*state.db).clone());

    match repo.get_for_author(request_id, auth.user_id()).await {
        Ok(detail) => detail_response(detail),
        Err(e) => purchasing_error_response(&e),
    }
}

/// PATCH `/requests/{request_id}` - Replace an editable request's items.
async fn update_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<CreateRequestBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    let input = match parse_items(payload.items) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .update_request(request_id, auth.user_id(), auth.name(), input)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

/// DELETE `/requests/{request_id}` - Delete an editable request.
async fn delete_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.delete_request(request_id, auth.user_id()).await {
        Ok(()) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

/// GET `/requests/{request_id}/verify?token=` - Verify an approval token.
///
/// Valid iff the stored token equals the supplied one and the signature
/// verifies.
async fn verify_request(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(request_id): Path<i64>,
    Query(query): Query<VerifyQuery>,
) -> impl IntoResponse {
    let repo = PurchasingRepository::new((*state.db).clone());

    let stored = match repo.stored_token(request_id).await {
        Ok(stored) => stored,
        Err(e) => return purchasing_error_response(&e),
    };

    let matches_stored = stored.as_deref() == Some(query.token.as_str());
    let payload = state
        .jwt_service
        .verify_verification_token(request_id, &query.token)
        .ok();

    match (matches_stored, payload) {
        (true, Some(payload)) => (
            StatusCode::OK,
            Json(json!({ "valid": true, "payload": payload })),
        )
            .into_response(),
        _ => (
            StatusCode::OK,
            Json(json!({ "valid": false, "payload": null })),
        )
            .into_response(),
    }
}
