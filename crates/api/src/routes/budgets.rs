//! Budget routes for authors.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::info;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_db::repositories::budget::{
    BudgetError, BudgetRepository, CreateBudgetInput, CreateBudgetItemInput,
};
use bursar_db::repositories::revision::{RevisionRepoError, RevisionRepository};
use bursar_shared::Role;
use bursar_shared::types::Period;

/// Creates the budget routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", post(create_budget))
        .route("/budgets", get(list_budgets))
        .route("/budgets/{budget_id}", get(get_budget))
        .route("/budgets/{budget_id}/submit", post(submit_budget))
        .route(
            "/budgets/{budget_id}/items/{item_id}/revision-answer",
            post(submit_revision_answer),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for one budget item.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetItemRequest {
    /// Sub-account of the item.
    pub account_id: i64,
    /// Catalog item reference.
    pub item_id: Option<i64>,
    /// Item name.
    pub item_name: String,
    /// Item description.
    pub itemdescription: Option<String>,
    /// Requested quantity.
    pub quantity: String,
    /// Estimated unit cost.
    pub cost: String,
    /// Unit label.
    pub unit: String,
    /// Months the quantity covers.
    #[serde(default = "default_period_months")]
    pub period_months: i32,
    /// Author notes.
    pub notes: Option<String>,
}

fn default_period_months() -> i32 {
    1
}

/// Request body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    /// Budget period, "MM-YYYY".
    pub period: String,
    /// Budget title.
    pub title: String,
    /// Budget description.
    pub description: Option<String>,
    /// Request type.
    #[serde(default = "default_request_type")]
    pub request_type: String,
    /// Initial items.
    #[serde(default)]
    pub items: Vec<CreateBudgetItemRequest>,
}

fn default_request_type() -> String {
    "new".to_string()
}

/// Request body for a revision answer.
#[derive(Debug, Deserialize)]
pub struct RevisionAnswerRequest {
    /// The author's answer.
    pub answer_text: String,
}

/// Response for a budget header.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    /// Budget ID.
    pub id: i64,
    /// Budget period.
    pub period: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Request type.
    pub request_type: String,
    /// Status.
    pub budget_status: String,
    /// Created at timestamp.
    pub created_at: String,
    /// Closed at timestamp.
    pub closed_at: Option<String>,
}

fn budget_to_response(budget: bursar_db::entities::budgets::Model) -> BudgetResponse {
    BudgetResponse {
        id: budget.id,
        period: budget.period,
        title: budget.title,
        description: budget.description,
        request_type: budget.request_type,
        budget_status: budget.budget_status,
        created_at: budget.created_at.to_rfc3339(),
        closed_at: budget.closed_at.map(|t| t.to_rfc3339()),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/budgets` - Create a draft budget with items.
async fn create_budget(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBudgetRequest>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    if payload.title.trim().is_empty() {
        return error_response(400, "TITLE_REQUIRED", "Title is required");
    }
    if Period::from_str(&payload.period).is_err() {
        return error_response(400, "INVALID_PERIOD", "Period must be MM-YYYY");
    }

    let mut items = Vec::with_capacity(payload.items.len());
    for item in payload.items {
        let (quantity, cost) = match (parse_amount(&item.quantity), parse_amount(&item.cost)) {
            (Ok(q), Ok(c)) => (q, c),
            _ => return error_response(400, "INVALID_AMOUNT", "Invalid quantity or cost"),
        };
        items.push(CreateBudgetItemInput {
            account_id: item.account_id,
            item_id: item.item_id,
            item_name: item.item_name,
            itemdescription: item.itemdescription,
            quantity,
            cost,
            unit: item.unit,
            period_months: item.period_months,
            notes: item.notes,
        });
    }

    let repo = BudgetRepository::new((*state.db).clone());
    let input = CreateBudgetInput {
        period: payload.period,
        title: payload.title,
        description: payload.description,
        request_type: payload.request_type,
        items,
    };

    match repo.create_budget(auth.user_id(), auth.school_id(), input).await {
        Ok(budget) => {
            (StatusCode::CREATED, Json(budget_to_response(budget))).into_response()
        }
        Err(e) => budget_error_response(&e),
    }
}

/// GET `/budgets` - List the caller's budgets.
async fn list_budgets(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    match repo.list_for_user(auth.user_id()).await {
        Ok(budgets) => {
            let items: Vec<BudgetResponse> =
                budgets.into_iter().map(budget_to_response).collect();
            (StatusCode::OK, Json(json!({ "data": items }))).into_response()
        }
        Err(e) => budget_error_response(&e),
    }
}

/// GET `/budgets/{budget_id}` - Read one budget with items.
async fn get_budget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(budget_id): Path<i64>,
) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    match repo.get_for_user(budget_id, auth.user_id()).await {
        Ok((budget, items)) => (
            StatusCode::OK,
            Json(json!({
                "budget": budget_to_response(budget),
                "items": items,
            })),
        )
            .into_response(),
        Err(e) => budget_error_response(&e),
    }
}

/// POST `/budgets/{budget_id}/submit` - Submit a draft for review.
///
/// Steps are materialized per item from the resolved template and the budget
/// flips to `in_review`.
async fn submit_budget(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(budget_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    let repo = BudgetRepository::new((*state.db).clone());

    match repo.submit_budget(budget_id, auth.user_id()).await {
        Ok(budget) => {
            info!(budget_id, user_id = auth.user_id(), "budget submitted");
            (StatusCode::OK, Json(budget_to_response(budget))).into_response()
        }
        Err(e) => budget_error_response(&e),
    }
}

/// POST `/budgets/{budget_id}/items/{item_id}/revision-answer` - Answer a
/// revision request on one item.
async fn submit_revision_answer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((budget_id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<RevisionAnswerRequest>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Author]) {
        return response;
    }

    // The answer must target the caller's own budget.
    let budget_repo = BudgetRepository::new((*state.db).clone());
    if let Err(e) = budget_repo.get_for_user(budget_id, auth.user_id()).await {
        return budget_error_response(&e);
    }

    let repo = RevisionRepository::new((*state.db).clone());
    match repo
        .submit_answer(budget_id, item_id, auth.user_id(), &payload.answer_text)
        .await
    {
        Ok(answer) => (StatusCode::CREATED, Json(answer)).into_response(),
        Err(e) => revision_error_response(&e),
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

fn budget_error_response(e: &BudgetError) -> axum::response::Response {
    error_response(e.status_code(), error_code(e), &e.to_string())
}

const fn error_code(e: &BudgetError) -> &'static str {
    match e {
        BudgetError::NotFound(_) => "NOT_FOUND",
        BudgetError::NotDraft(_) => "NOT_DRAFT",
        BudgetError::Empty(_) => "EMPTY_BUDGET",
        BudgetError::NoTemplateBound { .. } => "NO_TEMPLATE_BOUND",
        BudgetError::Template(_) => "INVALID_TEMPLATE",
        BudgetError::Database(_) => "DATABASE_ERROR",
    }
}

fn revision_error_response(e: &RevisionRepoError) -> axum::response::Response {
    let code = match e {
        RevisionRepoError::ItemNotFound(_) => "NOT_FOUND",
        RevisionRepoError::Invalid(_) => "INVALID_REVISION",
        RevisionRepoError::Database(_) => "DATABASE_ERROR",
    };
    error_response(e.status_code(), code, &e.to_string())
}
