//! Revision ledger routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, middleware::AuthUser, routes::error_response};
use bursar_db::repositories::revision::{
    RevisionFilter, RevisionRepoError, RevisionRepository, RevisionRow,
};
use bursar_shared::Role;

/// Creates the revision ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/revisions", get(list_revisions))
        .route("/revisions/summary", get(revision_summary))
        .route("/revisions/{item_id}/resolve", post(resolve_revision))
}

/// Query filters for the revision ledger.
#[derive(Debug, Deserialize)]
pub struct RevisionQuery {
    /// Budget period, "MM-YYYY".
    pub period: Option<String>,
    /// School of the budget.
    pub school_id: Option<i64>,
    /// Sub-account of the item.
    pub account_id: Option<i64>,
    /// Budget author.
    pub assignee_id: Option<i64>,
}

fn build_filter(auth: &AuthUser, query: RevisionQuery) -> RevisionFilter {
    RevisionFilter {
        period: query.period,
        school_id: query.school_id,
        account_id: query.account_id,
        assignee_id: query.assignee_id,
        // Moderators only see schools whose users are assigned to them.
        moderator_id: (auth.role() == Role::Moderator).then(|| auth.user_id()),
    }
}

fn row_to_json(row: RevisionRow) -> serde_json::Value {
    json!({
        "item": row.item,
        "budget_id": row.budget_id,
        "period": row.period,
        "school_id": row.school_id,
        "revision_answer": row.revision_answer,
        "revision_answered_at": row.revision_answered_at.map(|t| t.to_rfc3339()),
        "aging_days": row.aging_days,
    })
}

/// GET `/revisions` - Items under revision, with latest answers and aging.
async fn list_revisions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RevisionQuery>,
) -> impl IntoResponse {
    if let Err(response) =
        auth.require_role(&[Role::Moderator, Role::Coordinator, Role::Reviewer, Role::Admin])
    {
        return response;
    }

    let repo = RevisionRepository::new((*state.db).clone());
    match repo.list(&build_filter(&auth, query)).await {
        Ok(rows) => {
            let data: Vec<serde_json::Value> = rows.into_iter().map(row_to_json).collect();
            (StatusCode::OK, Json(json!({ "data": data }))).into_response()
        }
        Err(e) => revision_error_response(&e),
    }
}

/// GET `/revisions/summary` - Aging buckets over the filtered ledger.
async fn revision_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RevisionQuery>,
) -> impl IntoResponse {
    if let Err(response) =
        auth.require_role(&[Role::Moderator, Role::Coordinator, Role::Reviewer, Role::Admin])
    {
        return response;
    }

    let repo = RevisionRepository::new((*state.db).clone());
    match repo.summary(&build_filter(&auth, query)).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "0-1": summary.up_to_one,
                "2-3": summary.two_to_three,
                "4-7": summary.four_to_seven,
                ">7": summary.over_seven,
            })),
        )
            .into_response(),
        Err(e) => revision_error_response(&e),
    }
}

/// POST `/revisions/{item_id}/resolve` - Close out a revision.
async fn resolve_revision(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<i64>,
) -> impl IntoResponse {
    if let Err(response) =
        auth.require_role(&[Role::Moderator, Role::Coordinator, Role::Admin])
    {
        return response;
    }

    let repo = RevisionRepository::new((*state.db).clone());
    match repo.resolve(item_id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => revision_error_response(&e),
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
