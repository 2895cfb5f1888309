//! Administrator routes: request overrides, assignment sync, templates.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::routes::moderation::{DecisionBody, parse_decisions};
use crate::routes::requests::{
    RequestResponse, purchasing_error_response, request_to_response,
};
use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_core::assignment::{AssignmentError, ControlArea, SyncMode};
use bursar_db::repositories::assignment::AssignmentRepository;
use bursar_db::repositories::purchasing::PurchasingRepository;
use bursar_db::repositories::template::{
    CreateStageInput, CreateTemplateInput, TemplateRepoError, TemplateRepository,
};
use bursar_shared::Role;
use bursar_shared::types::{PageRequest, PageResponse};

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/requests", get(list_in_review))
        .route("/admin/requests/{request_id}/approve", post(force_approve))
        .route("/admin/requests/{request_id}/items", patch(override_decisions))
        .route(
            "/admin/departments/{department_id}/assignments/sync",
            post(sync_assignments),
        )
        .route("/admin/assignments/owners", get(lookup_owners))
        .route("/admin/templates", get(list_templates))
        .route("/admin/templates", post(create_template))
        .route("/admin/templates/{template_id}/stages", get(get_stages))
        .route("/admin/bindings", post(create_binding))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query string selecting the sync conflict mode.
#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// `strict` (default) or `replace`.
    pub mode: Option<String>,
}

/// Request body for an admin per-item override.
#[derive(Debug, Deserialize)]
pub struct OverrideBody {
    /// Moderator-column decisions to force.
    #[serde(default)]
    pub mod_items: Vec<DecisionBody>,
    /// Coordinator-column decisions to force.
    #[serde(default)]
    pub coordinator_items: Vec<DecisionBody>,
}

/// Request body for one stage of a new template.
#[derive(Debug, Deserialize)]
pub struct StageBody {
    /// Stage name.
    pub stage_name: String,
    /// Position, unique and ≥ 1.
    pub sort_order: i32,
    /// Owning department.
    pub owner_department_id: i64,
    /// Whether reviewers here may send items back.
    #[serde(default)]
    pub allow_revise: bool,
}

/// Request body for creating a template.
#[derive(Debug, Deserialize)]
pub struct CreateTemplateBody {
    /// Template name.
    pub name: String,
    /// Ordered stages.
    pub stages: Vec<StageBody>,
}

/// Request body for binding a template.
#[derive(Debug, Deserialize)]
pub struct CreateBindingBody {
    /// School of the binding.
    pub school_id: i64,
    /// Account of the binding.
    pub account_id: i64,
    /// Bound template.
    pub template_id: i64,
    /// Lower wins.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    100
}

// ============================================================================
// Route Handlers - purchase requests
// ============================================================================

/// GET `/admin/requests` - Requests in a review-eligible status, paginated.
async fn list_in_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.list_in_review(&page).await {
        Ok((requests, total)) => {
            let data: Vec<RequestResponse> =
                requests.into_iter().map(request_to_response).collect();
            (
                StatusCode::OK,
                Json(PageResponse::new(data, page.page, page.per_page, total)),
            )
                .into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// POST `/admin/requests/{request_id}/approve` - Force approval.
async fn force_approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let token = match state
        .jwt_service
        .mint_verification_token(request_id, Utc::now())
    {
        Ok(token) => token,
        Err(e) => return error_response(500, "TOKEN_MINT_FAILED", &e.to_string()),
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo.force_approve(request_id, auth.name(), token).await {
        Ok(request) => {
            info!(request_id, "request force-approved by admin");
            (StatusCode::OK, Json(request_to_response(request))).into_response()
        }
        Err(e) => purchasing_error_response(&e),
    }
}

/// PATCH `/admin/requests/{request_id}/items` - Override per-item decisions.
///
/// The route entry is logged even when the recomputation is a no-op.
async fn override_decisions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<i64>,
    Json(payload): Json<OverrideBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let mod_decisions = match parse_decisions(payload.mod_items) {
        Ok(decisions) => decisions,
        Err(response) => return response,
    };
    let coordinator_decisions = match parse_decisions(payload.coordinator_items) {
        Ok(decisions) => decisions,
        Err(response) => return response,
    };

    let repo = PurchasingRepository::new((*state.db).clone());
    match repo
        .override_decisions(request_id, auth.name(), mod_decisions, coordinator_decisions)
        .await
    {
        Ok(request) => (StatusCode::OK, Json(request_to_response(request))).into_response(),
        Err(e) => purchasing_error_response(&e),
    }
}

// ============================================================================
// Route Handlers - assignments
// ============================================================================

/// POST `/admin/departments/{department_id}/assignments/sync?mode=` -
/// Rewrite a department's control assignments to its assigned sets.
async fn sync_assignments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(department_id): Path<i64>,
    Query(query): Query<SyncQuery>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let mode = match query.mode.as_deref() {
        None => SyncMode::Strict,
        Some(raw) => match SyncMode::parse(raw) {
            Some(mode) => mode,
            None => {
                return error_response(400, "INVALID_MODE", "mode must be strict or replace");
            }
        },
    };

    let repo = AssignmentRepository::new((*state.db).clone());
    match repo.sync_for_department(department_id, mode).await {
        Ok(report) => (StatusCode::OK, Json(json!({ "ok": true, "report": report })))
            .into_response(),
        Err(AssignmentError::Conflicts(conflicts)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "assignment_conflict",
                "message": "Assignments already owned by another department",
                "conflicts": conflicts,
            })),
        )
            .into_response(),
        Err(e) => error_response(e.status_code(), e.error_code(), &e.to_string()),
    }
}

/// Query string for an ownership lookup.
#[derive(Debug, Deserialize)]
pub struct OwnersQuery {
    /// School of the lookup.
    pub school_id: i64,
    /// Account of the lookup.
    pub account_id: i64,
    /// Restrict to one control area.
    pub area: Option<String>,
}

/// GET `/admin/assignments/owners?school_id=&account_id=&area=` - Resolve
/// the reviewing department(s) for (school, account).
async fn lookup_owners(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OwnersQuery>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = AssignmentRepository::new((*state.db).clone());

    if let Some(raw) = query.area.as_deref() {
        let Some(area) = ControlArea::parse(raw) else {
            return error_response(400, "INVALID_AREA", "area must be logistics, needed, or cost");
        };
        return match repo.owner(query.school_id, query.account_id, area).await {
            Ok(owner) => (
                StatusCode::OK,
                Json(json!({ "area": area.as_str(), "department_id": owner })),
            )
                .into_response(),
            Err(e) => error_response(e.status_code(), e.error_code(), &e.to_string()),
        };
    }

    match repo.owners(query.school_id, query.account_id).await {
        Ok(owners) => (StatusCode::OK, Json(owners)).into_response(),
        Err(e) => error_response(e.status_code(), e.error_code(), &e.to_string()),
    }
}

// ============================================================================
// Route Handlers - templates
// ============================================================================

/// GET `/admin/templates` - List workflow templates.
async fn list_templates(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = TemplateRepository::new((*state.db).clone());
    match repo.list_templates().await {
        Ok(templates) => (StatusCode::OK, Json(json!({ "data": templates }))).into_response(),
        Err(e) => template_error_response(&e),
    }
}

/// POST `/admin/templates` - Create a template with its stages.
async fn create_template(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateTemplateBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    if payload.name.trim().is_empty() {
        return error_response(400, "NAME_REQUIRED", "Name is required");
    }

    let repo = TemplateRepository::new((*state.db).clone());
    let input = CreateTemplateInput {
        name: payload.name,
        stages: payload
            .stages
            .into_iter()
            .map(|s| CreateStageInput {
                stage_name: s.stage_name,
                sort_order: s.sort_order,
                owner_department_id: s.owner_department_id,
                allow_revise: s.allow_revise,
            })
            .collect(),
    };

    match repo.create_template(input).await {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(e) => template_error_response(&e),
    }
}

/// GET `/admin/templates/{template_id}/stages` - Ordered stages.
async fn get_stages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(template_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = TemplateRepository::new((*state.db).clone());
    match repo.stages(template_id).await {
        Ok(stages) => {
            let data: Vec<serde_json::Value> = stages
                .into_iter()
                .map(|s| {
                    json!({
                        "stage_name": s.stage_name,
                        "sort_order": s.sort_order,
                        "owner_department_id": s.owner_department_id,
                        "allow_revise": s.allow_revise,
                    })
                })
                .collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => template_error_response(&e),
    }
}

/// POST `/admin/bindings` - Bind a template to (school, account).
async fn create_binding(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBindingBody>,
) -> impl IntoResponse {
    if let Err(response) = auth.require_role(&[Role::Admin]) {
        return response;
    }

    let repo = TemplateRepository::new((*state.db).clone());
    match repo
        .create_binding(
            payload.school_id,
            payload.account_id,
            payload.template_id,
            payload.priority,
        )
        .await
    {
        Ok(binding) => (StatusCode::CREATED, Json(binding)).into_response(),
        Err(e) => template_error_response(&e),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn template_error_response(e: &TemplateRepoError) -> axum::response::Response {
    let code = match e {
        TemplateRepoError::NotFound(_) => "NOT_FOUND",
        TemplateRepoError::Invalid(_) => "INVALID_TEMPLATE",
        TemplateRepoError::Database(_) => "DATABASE_ERROR",
    };
    error_response(e.status_code(), code, &e.to_string())
}
