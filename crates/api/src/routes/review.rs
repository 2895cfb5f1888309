//! Departmental review routes: logistics, needed, cost, and final stages.
//!
//! Every patch is a batch and commits atomically; the notification fan-out
//! is enqueued only after the commit.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_core::workflow::{FinalPurchaseStatus, WorkflowError};
use bursar_db::repositories::workflow::{
    CostDecisionInput, DecisionBatchResult, FinalDecisionInput, LogisticsDecisionInput,
    NeededDecisionInput, WorkflowRepository,
};
use bursar_shared::Role;
use bursar_shared::notify::{StageItemHint, StageWaiting};

/// Creates the review routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/review/items", get(list_stage_items))
        .route("/review/logistics", patch(decide_logistics))
        .route("/review/needed", patch(decide_needed))
        .route("/review/cost", patch(decide_cost))
        .route("/review/final", patch(decide_final))
        .route("/review/items/{item_id}/revise-back", post(revise_back))
}

// ============================================================================
// Request Types
// ============================================================================

/// One logistics decision.
#[derive(Debug, Deserialize)]
pub struct LogisticsItemRequest {
    /// Target item.
    pub item_id: i64,
    /// Quantity found in storage.
    pub provided_qty: String,
}

/// One needed decision.
#[derive(Debug, Deserialize)]
pub struct NeededItemRequest {
    /// Target item.
    pub item_id: i64,
    /// 1 needed, 0 not needed; absent records notes only and does not advance.
    pub needed_status: Option<i16>,
    /// Reviewer notes.
    pub notes: Option<String>,
}

/// One cost decision.
#[derive(Debug, Deserialize)]
pub struct CostItemRequest {
    /// Target item.
    pub item_id: i64,
    /// Recorded purchase cost.
    pub purchase_cost: String,
}

/// One coordinator final decision.
#[derive(Debug, Deserialize)]
pub struct FinalItemRequest {
    /// Target item.
    pub item_id: i64,
    /// One of `approved`, `adjusted`, `rejected`.
    pub final_purchase_status: String,
    /// Final cost, when adjusted.
    pub final_cost: Option<String>,
    /// Final quantity, when adjusted.
    pub final_quantity: Option<String>,
}

/// Batch wrapper used by all four decision endpoints.
#[derive(Debug, Deserialize)]
pub struct BatchRequest<T> {
    /// The per-item decisions.
    pub items: Vec<T>,
}

/// Request body for sending an item back.
#[derive(Debug, Deserialize)]
pub struct ReviseBackRequest {
    /// Why the item needs rework.
    pub revise_reason: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/review/items` - Items waiting at the caller's department.
async fn list_stage_items(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Reviewer, Role::Coordinator, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let repo = WorkflowRepository::new((*state.db).clone());

    match repo.list_stage_items(department_id).await {
        Ok(items) => {
            let data: Vec<serde_json::Value> = items
                .into_iter()
                .map(|entry| {
                    json!({
                        "item": entry.item,
                        "stage_name": entry.stage_name,
                        "step_id": entry.step_id,
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// PATCH `/review/logistics` - Batch logistics decisions.
async fn decide_logistics(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BatchRequest<LogisticsItemRequest>>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Reviewer, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut decisions = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        let Ok(provided_qty) = parse_amount(&item.provided_qty) else {
            return error_response(400, "INVALID_AMOUNT", "Invalid provided quantity");
        };
        decisions.push(LogisticsDecisionInput {
            item_id: item.item_id,
            provided_qty,
        });
    }

    let repo = WorkflowRepository::new((*state.db).clone());
    match repo.decide_logistics(department_id, decisions).await {
        Ok(result) => {
            notify_budgets(&state, &result);
            batch_response(&result)
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// PATCH `/review/needed` - Batch needed decisions.
///
/// Items advance only when a decision was supplied; notes alone are stored
/// without advancing.
async fn decide_needed(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BatchRequest<NeededItemRequest>>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Reviewer, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    for item in &payload.items {
        if !matches!(item.needed_status, None | Some(0) | Some(1)) {
            return error_response(400, "INVALID_DECISION", "needed_status must be 0 or 1");
        }
    }

    let item_ids: Vec<i64> = payload.items.iter().map(|i| i.item_id).collect();
    let decisions: Vec<NeededDecisionInput> = payload
        .items
        .into_iter()
        .map(|i| NeededDecisionInput {
            item_id: i.item_id,
            needed_status: i.needed_status,
            notes: i.notes,
        })
        .collect();

    let repo = WorkflowRepository::new((*state.db).clone());
    match repo.decide_needed(department_id, decisions).await {
        Ok(result) => {
            // Needed decisions carry per-item hints so the collaborator may
            // restrict recipients to the accounts of interest.
            state.notifier.enqueue(StageWaiting::NeededItems {
                items: item_ids
                    .iter()
                    .map(|&item_id| StageItemHint {
                        item_id,
                        source_stage: "needed".to_string(),
                    })
                    .collect(),
            });
            notify_budgets(&state, &result);
            batch_response(&result)
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// PATCH `/review/cost` - Batch cost decisions.
async fn decide_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BatchRequest<CostItemRequest>>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Reviewer, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut decisions = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        let Ok(purchase_cost) = parse_amount(&item.purchase_cost) else {
            return error_response(400, "INVALID_AMOUNT", "Invalid purchase cost");
        };
        decisions.push(CostDecisionInput {
            item_id: item.item_id,
            purchase_cost,
        });
    }

    let repo = WorkflowRepository::new((*state.db).clone());
    match repo.decide_cost(department_id, decisions).await {
        Ok(result) => {
            notify_budgets(&state, &result);
            batch_response(&result)
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// PATCH `/review/final` - Batch coordinator final decisions.
async fn decide_final(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BatchRequest<FinalItemRequest>>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Coordinator, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut decisions = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        let Some(status) = FinalPurchaseStatus::parse(&item.final_purchase_status) else {
            return error_response(
                400,
                "INVALID_DECISION",
                "final_purchase_status must be approved, adjusted, or rejected",
            );
        };
        let final_cost = match item.final_cost.as_deref().map(parse_amount) {
            Some(Ok(c)) => Some(c),
            Some(Err(())) => {
                return error_response(400, "INVALID_AMOUNT", "Invalid final cost");
            }
            None => None,
        };
        let final_quantity = match item.final_quantity.as_deref().map(parse_amount) {
            Some(Ok(q)) => Some(q),
            Some(Err(())) => {
                return error_response(400, "INVALID_AMOUNT", "Invalid final quantity");
            }
            None => None,
        };
        decisions.push(FinalDecisionInput {
            item_id: item.item_id,
            status,
            final_cost,
            final_quantity,
        });
    }

    let repo = WorkflowRepository::new((*state.db).clone());
    match repo.decide_final(department_id, decisions).await {
        Ok(result) => {
            notify_budgets(&state, &result);
            batch_response(&result)
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/review/items/{item_id}/revise-back` - Send an item back for
/// revision from a stage that allows it.
async fn revise_back(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
    Json(payload): Json<ReviseBackRequest>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Reviewer, Role::Coordinator, Role::Admin]) {
        return response;
    }
    let department_id = match auth.require_department() {
        Ok(id) => id,
        Err(response) => return response,
    };

    let repo = WorkflowRepository::new((*state.db).clone());
    match repo
        .revise_back(department_id, item_id, &payload.revise_reason)
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[allow(clippy::result_unit_err)]
fn parse_amount(s: &str) -> Result<Decimal, ()> {
    match Decimal::from_str(s) {
        Ok(d) if d >= Decimal::ZERO => Ok(d),
        _ => Err(()),
    }
}

fn notify_budgets(state: &AppState, result: &DecisionBatchResult) {
    if !result.touched_budget_ids.is_empty() {
        state.notifier.enqueue(StageWaiting::Budgets {
            budget_ids: result.touched_budget_ids.clone(),
        });
    }
}

fn batch_response(result: &DecisionBatchResult) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "advanced_items": result.advanced_items,
            "noop_items": result.noop_items,
            "closed_budget_ids": result.closed_budget_ids,
        })),
    )
        .into_response()
}

fn workflow_error_response(e: &WorkflowError) -> axum::response::Response {
    error_response(e.status_code(), e.error_code(), &e.to_string())
}
