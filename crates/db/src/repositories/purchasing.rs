//! Purchasing repository for direct purchase requests.
//!
//! Decision batches and status transitions run inside one transaction with
//! the total and aggregate-status recomputation. Route-log entries are
//! appended after commit; an append failure degrades to a warning and never
//! fails the caller.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};

use bursar_core::purchasing::{
    DecisionValue, ItemDecisions, PurchasingError, PurchasingService, RequestStatus, route_stage,
};
use bursar_shared::types::PageRequest;

use crate::entities::{purchasing_request_items, purchasing_requests, request_routes, users};

/// Input for one item of a new request.
#[derive(Debug, Clone)]
pub struct CreateRequestItemInput {
    /// Item name.
    pub item_name: String,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Unit label.
    pub unit: String,
    /// Unit price.
    pub unit_price: Decimal,
    /// Item description.
    pub description: Option<String>,
}

/// Input for a new purchase request.
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
    /// The request's items.
    pub items: Vec<CreateRequestItemInput>,
}

/// One per-item decision in a batch.
#[derive(Debug, Clone)]
pub struct ItemDecisionInput {
    /// Target item.
    pub item_id: i64,
    /// The decision.
    pub decision: DecisionValue,
}

/// A request header with its items.
#[derive(Debug, Clone)]
pub struct RequestWithItems {
    /// The header.
    pub request: purchasing_requests::Model,
    /// The items.
    pub items: Vec<purchasing_request_items::Model>,
    /// The append-only route trail.
    pub routes: Vec<request_routes::Model>,
}

/// Purchasing repository.
#[derive(Debug, Clone)]
pub struct PurchasingRepository {
    db: DatabaseConnection,
}

impl PurchasingRepository {
    /// Creates a new purchasing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    // ========================================================================
    // Author operations
    // ========================================================================

    /// Creates a request for an author, or on behalf of one by a moderator.
    ///
    /// A moderator-originated request starts with `mod_status = 'Decided'`
    /// and every item pre-decided `needed`; an author-created request leaves
    /// both absent (they coalesce to needed downstream).
    ///
    /// # Errors
    ///
    /// Returns an error if the database fails.
    pub async fn create_request(
        &self,
        author_id: i64,
        actor_name: &str,
        input: CreateRequestInput,
        by_moderator: bool,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let now = Utc::now();
        let request = purchasing_requests::ActiveModel {
            user_id: Set(author_id),
            status: Set(RequestStatus::Pending.as_str().to_string()),
            mod_status: Set(by_moderator.then(|| "Decided".to_string())),
            total_amount: Set(Decimal::ZERO),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            is_printed: Set(false),
            ..Default::default()
        };
        let request = request
            .insert(&txn)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        for item in input.items {
            let total_price = (item.quantity * item.unit_price).round_dp(2);
            let row = purchasing_request_items::ActiveModel {
                request_id: Set(request.request_id),
                item_name: Set(item.item_name),
                quantity: Set(item.quantity),
                unit: Set(item.unit),
                unit_price: Set(item.unit_price),
                description: Set(item.description),
                total_price: Set(total_price),
                mod_decision: Set(by_moderator.then(|| DecisionValue::Needed.as_str().to_string())),
                ..Default::default()
            };
            row.insert(&txn)
                .await
                .map_err(|e| PurchasingError::Database(e.to_string()))?;
        }

        let request = recompute_aggregates(&txn, request.request_id, StatusScope::TotalOnly).await?;

        txn.commit()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request.request_id, route_stage::STARTED, actor_name)
            .await;

        info!(request_id = request.request_id, author_id, "purchase request created");
        Ok(request)
    }

    /// Lists an author's requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_author(
        &self,
        user_id: i64,
    ) -> Result<Vec<purchasing_requests::Model>, PurchasingError> {
        purchasing_requests::Entity::find()
            .filter(purchasing_requests::Column::UserId.eq(user_id))
            .order_by_desc(purchasing_requests::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))
    }

    /// Loads a request with items and routes, scoped to its author.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound` outside the author's scope.
    pub async fn get_for_author(
        &self,
        request_id: i64,
        user_id: i64,
    ) -> Result<RequestWithItems, PurchasingError> {
        let request = self.load_request(request_id).await?;
        if request.user_id != user_id {
            return Err(PurchasingError::RequestNotFound(request_id));
        }
        self.with_items(request).await
    }

    /// Replaces the items of an editable request and logs the change.
    ///
    /// An edited send-back returns to `Pending` for the moderator.
    ///
    /// # Errors
    ///
    /// Returns an error outside the author's scope or once approved.
    pub async fn update_request(
        &self,
        request_id: i64,
        user_id: i64,
        actor_name: &str,
        input: CreateRequestInput,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let request = load_request_on(&txn, request_id).await?;
        if request.user_id != user_id {
            return Err(PurchasingError::RequestNotFound(request_id));
        }
        let status = parse_status(&request)?;
        PurchasingService::ensure_editable(request_id, status)?;

        purchasing_request_items::Entity::delete_many()
            .filter(purchasing_request_items::Column::RequestId.eq(request_id))
            .exec(&txn)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        for item in input.items {
            let total_price = (item.quantity * item.unit_price).round_dp(2);
            let row = purchasing_request_items::ActiveModel {
                request_id: Set(request_id),
                item_name: Set(item.item_name),
                quantity: Set(item.quantity),
                unit: Set(item.unit),
                unit_price: Set(item.unit_price),
                description: Set(item.description),
                total_price: Set(total_price),
                ..Default::default()
            };
            row.insert(&txn)
                .await
                .map_err(|e| PurchasingError::Database(e.to_string()))?;
        }

        let mut active: purchasing_requests::ActiveModel = request.into();
        if status == RequestStatus::Revised || status == RequestStatus::RevisedByUp {
            active.status = Set(RequestStatus::Pending.as_str().to_string());
        }
        active.updated_at = Set(Utc::now().into());
        active
            .update(&txn)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let request = recompute_aggregates(&txn, request_id, StatusScope::TotalOnly).await?;

        txn.commit()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::CHANGED, actor_name)
            .await;

        Ok(request)
    }

    /// Deletes an editable request.
    ///
    /// # Errors
    ///
    /// Returns an error outside the author's scope or once approved.
    pub async fn delete_request(
        &self,
        request_id: i64,
        user_id: i64,
    ) -> Result<(), PurchasingError> {
        let request = self.load_request(request_id).await?;
        if request.user_id != user_id {
            return Err(PurchasingError::RequestNotFound(request_id));
        }
        PurchasingService::ensure_editable(request_id, parse_status(&request)?)?;

        purchasing_requests::Entity::delete_by_id(request_id)
            .exec(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        info!(request_id, user_id, "purchase request deleted");
        Ok(())
    }

    // ========================================================================
    // Moderator operations
    // ========================================================================

    /// Lists requests assigned to a moderator: authors in the moderator's
    /// school whose `budget_mod` names this moderator.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_moderator(
        &self,
        moderator_id: i64,
        moderator_school: i64,
    ) -> Result<Vec<purchasing_requests::Model>, PurchasingError> {
        let authors: Vec<i64> = users::Entity::find()
            .filter(users::Column::SchoolId.eq(moderator_school))
            .filter(users::Column::BudgetMod.eq(moderator_id))
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?
            .into_iter()
            .map(|u| u.id)
            .collect();

        if authors.is_empty() {
            return Ok(Vec::new());
        }

        purchasing_requests::Entity::find()
            .filter(purchasing_requests::Column::UserId.is_in(authors))
            .order_by_desc(purchasing_requests::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))
    }

    /// Records a moderator's per-item decisions and recomputes aggregates.
    ///
    /// # Errors
    ///
    /// Returns an error outside the moderator's scope or once approved.
    pub async fn set_mod_decisions(
        &self,
        request_id: i64,
        moderator_id: i64,
        moderator_school: i64,
        decisions: Vec<ItemDecisionInput>,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let request = load_request_on(&txn, request_id).await?;
        check_moderator_scope(&txn, &request, moderator_id, moderator_school).await?;
        PurchasingService::ensure_editable(request_id, parse_status(&request)?)?;

        apply_decisions(&txn, request_id, &decisions, DecisionColumn::Moderator).await?;
        let request = recompute_aggregates(&txn, request_id, StatusScope::Moderator).await?;

        txn.commit()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        Ok(request)
    }

    /// Forwards a request to the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error outside the moderator's scope or on an invalid
    /// transition.
    pub async fn send_request(
        &self,
        request_id: i64,
        moderator_id: i64,
        moderator_school: i64,
        actor_name: &str,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        check_moderator_scope(&self.db, &request, moderator_id, moderator_school).await?;

        let next = PurchasingService::send(parse_status(&request)?)?;

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.status = Set(next.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::REQUESTED, actor_name)
            .await;

        info!(request_id, "purchase request forwarded");
        Ok(updated)
    }

    /// Sends a request back to the author with a comment.
    ///
    /// # Errors
    ///
    /// Returns an error outside the moderator's scope, on an empty comment,
    /// or on an invalid transition.
    pub async fn revise_by_moderator(
        &self,
        request_id: i64,
        moderator_id: i64,
        moderator_school: i64,
        actor_name: &str,
        comment: &str,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        check_moderator_scope(&self.db, &request, moderator_id, moderator_school).await?;

        let next = PurchasingService::revise_by_moderator(parse_status(&request)?, comment)?;

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.status = Set(next.as_str().to_string());
        active.mod_status = Set(Some("Revised".to_string()));
        active.revise_comment = Set(Some(comment.to_string()));
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::REVISED, actor_name)
            .await;

        Ok(updated)
    }

    // ========================================================================
    // Coordinator operations
    // ========================================================================

    /// Lists requests authored within a school, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_school(
        &self,
        school_id: i64,
    ) -> Result<Vec<purchasing_requests::Model>, PurchasingError> {
        let authors: Vec<i64> = users::Entity::find()
            .filter(users::Column::SchoolId.eq(school_id))
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?
            .into_iter()
            .map(|u| u.id)
            .collect();

        if authors.is_empty() {
            return Ok(Vec::new());
        }

        purchasing_requests::Entity::find()
            .filter(purchasing_requests::Column::UserId.is_in(authors))
            .order_by_desc(purchasing_requests::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))
    }

    /// Records a coordinator's per-item decisions and recomputes aggregates.
    ///
    /// # Errors
    ///
    /// Returns an error outside the coordinator's school or once approved.
    pub async fn set_coordinator_decisions(
        &self,
        request_id: i64,
        coordinator_school: i64,
        decisions: Vec<ItemDecisionInput>,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let request = load_request_on(&txn, request_id).await?;
        check_school_scope(&txn, &request, coordinator_school).await?;
        PurchasingService::ensure_editable(request_id, parse_status(&request)?)?;

        apply_decisions(&txn, request_id, &decisions, DecisionColumn::Coordinator).await?;
        let request = recompute_aggregates(&txn, request_id, StatusScope::Coordinator).await?;

        txn.commit()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        Ok(request)
    }

    /// Approves a forwarded request, storing its verification token.
    ///
    /// The token is minted by the caller (it binds `request_id` to the
    /// approval time) and returned to the author for later verification.
    ///
    /// # Errors
    ///
    /// Returns an error outside the coordinator's school or on an invalid
    /// transition.
    pub async fn approve(
        &self,
        request_id: i64,
        coordinator_school: i64,
        actor_name: &str,
        verification_token: String,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        check_school_scope(&self.db, &request, coordinator_school).await?;

        let next = PurchasingService::approve(parse_status(&request)?)?;

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.status = Set(next.as_str().to_string());
        active.verification_token = Set(Some(verification_token));
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::APPROVED, actor_name)
            .await;

        info!(request_id, "purchase request approved");
        Ok(updated)
    }

    /// Returns the stored verification token for comparison.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound` for unknown requests.
    pub async fn stored_token(&self, request_id: i64) -> Result<Option<String>, PurchasingError> {
        let request = self.load_request(request_id).await?;
        Ok(request.verification_token)
    }

    /// Sends a forwarded request back down with a comment.
    ///
    /// # Errors
    ///
    /// Returns an error outside the coordinator's school, on an empty
    /// comment, or on an invalid transition.
    pub async fn revise_by_coordinator(
        &self,
        request_id: i64,
        coordinator_school: i64,
        actor_name: &str,
        comment: &str,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        check_school_scope(&self.db, &request, coordinator_school).await?;

        let next = PurchasingService::revise_by_coordinator(parse_status(&request)?, comment)?;

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.status = Set(next.as_str().to_string());
        active.coordinator_status = Set(Some("Revised".to_string()));
        active.revise_comment_by_coordinator = Set(Some(comment.to_string()));
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::REVISED, actor_name)
            .await;

        Ok(updated)
    }

    // ========================================================================
    // Archiver (muhasebeci) operations
    // ========================================================================

    /// Lists approved requests within a school.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_approved_for_school(
        &self,
        school_id: i64,
    ) -> Result<Vec<purchasing_requests::Model>, PurchasingError> {
        let requests = self.list_for_school(school_id).await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.status == RequestStatus::Approved.as_str())
            .collect())
    }

    /// Marks an approved request as printed. The archiver can change nothing
    /// else.
    ///
    /// # Errors
    ///
    /// Returns an error outside the archiver's school or while unapproved.
    pub async fn set_printed(
        &self,
        request_id: i64,
        school_id: i64,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        check_school_scope(&self.db, &request, school_id).await?;

        if parse_status(&request)? != RequestStatus::Approved {
            return Err(PurchasingError::InvalidTransition {
                from: parse_status(&request)?,
                to: RequestStatus::Approved,
            });
        }

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.is_printed = Set(true);
        active.updated_at = Set(Utc::now().into());
        active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Lists requests in a review-eligible status, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_in_review(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<purchasing_requests::Model>, u64), PurchasingError> {
        let paginator = purchasing_requests::Entity::find()
            .filter(purchasing_requests::Column::Status.is_in([
                RequestStatus::Pending.as_str(),
                RequestStatus::Forwarded.as_str(),
                RequestStatus::Revised.as_str(),
                RequestStatus::RevisedByUp.as_str(),
            ]))
            .order_by_desc(purchasing_requests::Column::CreatedAt)
            .paginate(&self.db, page.limit().max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;
        let requests = paginator
            .fetch_page(u64::from(page.page.saturating_sub(1)))
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        Ok((requests, total))
    }

    /// Admin force-approves a request from any live status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is unknown or already approved.
    pub async fn force_approve(
        &self,
        request_id: i64,
        actor_name: &str,
        verification_token: String,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let request = self.load_request(request_id).await?;
        let next = PurchasingService::force_approve(request_id, parse_status(&request)?)?;

        let mut active: purchasing_requests::ActiveModel = request.into();
        active.status = Set(next.as_str().to_string());
        active.verification_token = Set(Some(verification_token));
        active.updated_at = Set(Utc::now().into());
        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::ADMIN_APPROVED, actor_name)
            .await;

        info!(request_id, "purchase request force-approved");
        Ok(updated)
    }

    /// Admin overrides per-item decisions on either column.
    ///
    /// The "Admin Override" route entry is appended even when the
    /// recomputation changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is unknown or the database fails.
    pub async fn override_decisions(
        &self,
        request_id: i64,
        actor_name: &str,
        mod_decisions: Vec<ItemDecisionInput>,
        coordinator_decisions: Vec<ItemDecisionInput>,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        load_request_on(&txn, request_id).await?;

        apply_decisions(&txn, request_id, &mod_decisions, DecisionColumn::Moderator).await?;
        apply_decisions(
            &txn,
            request_id,
            &coordinator_decisions,
            DecisionColumn::Coordinator,
        )
        .await?;
        let request = recompute_aggregates(&txn, request_id, StatusScope::Both).await?;

        txn.commit()
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        self.append_route(request_id, route_stage::ADMIN_OVERRIDE, actor_name)
            .await;

        Ok(request)
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Loads a request with items and routes, without scope checks.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound` for unknown requests.
    pub async fn with_items(
        &self,
        request: purchasing_requests::Model,
    ) -> Result<RequestWithItems, PurchasingError> {
        let items = purchasing_request_items::Entity::find()
            .filter(purchasing_request_items::Column::RequestId.eq(request.request_id))
            .order_by_asc(purchasing_request_items::Column::ItemId)
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        let routes = request_routes::Entity::find()
            .filter(request_routes::Column::RequestId.eq(request.request_id))
            .order_by_asc(request_routes::Column::Time)
            .all(&self.db)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;

        Ok(RequestWithItems {
            request,
            items,
            routes,
        })
    }

    /// Loads a bare request header.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound` for unknown requests.
    pub async fn load_request(
        &self,
        request_id: i64,
    ) -> Result<purchasing_requests::Model, PurchasingError> {
        load_request_on(&self.db, request_id).await
    }

    /// Appends a route-log entry after the primary mutation committed.
    /// Failure is a degraded side effect: logged, never surfaced.
    async fn append_route(&self, request_id: i64, stage: &str, user_name: &str) {
        let row = request_routes::ActiveModel {
            request_id: Set(request_id),
            stage: Set(stage.to_string()),
            user_name: Set(user_name.to_string()),
            time: Set(Utc::now().into()),
            ..Default::default()
        };

        if let Err(e) = row.insert(&self.db).await {
            warn!(request_id, stage, error = %e, "route log append failed");
        }
    }
}

// ============================================================================
// Free helpers
// ============================================================================

enum DecisionColumn {
    Moderator,
    Coordinator,
}

/// Which aggregate status columns a recomputation refreshes. The total is
/// always refreshed; a column's status only moves once that reviewer
/// actually decided something.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StatusScope {
    TotalOnly,
    Moderator,
    Coordinator,
    Both,
}

async fn load_request_on<C: ConnectionTrait>(
    conn: &C,
    request_id: i64,
) -> Result<purchasing_requests::Model, PurchasingError> {
    purchasing_requests::Entity::find_by_id(request_id)
        .one(conn)
        .await
        .map_err(|e| PurchasingError::Database(e.to_string()))?
        .ok_or(PurchasingError::RequestNotFound(request_id))
}

fn parse_status(request: &purchasing_requests::Model) -> Result<RequestStatus, PurchasingError> {
    RequestStatus::parse(&request.status)
        .ok_or_else(|| PurchasingError::Database(format!("unknown status {}", request.status)))
}

/// A moderator may only touch requests whose author is in their school and
/// assigned to them. Scope misses read as not-found.
async fn check_moderator_scope<C: ConnectionTrait>(
    conn: &C,
    request: &purchasing_requests::Model,
    moderator_id: i64,
    moderator_school: i64,
) -> Result<(), PurchasingError> {
    let author = users::Entity::find_by_id(request.user_id)
        .one(conn)
        .await
        .map_err(|e| PurchasingError::Database(e.to_string()))?
        .ok_or(PurchasingError::RequestNotFound(request.request_id))?;

    if author.school_id == Some(moderator_school) && author.budget_mod == Some(moderator_id) {
        Ok(())
    } else {
        Err(PurchasingError::RequestNotFound(request.request_id))
    }
}

async fn check_school_scope<C: ConnectionTrait>(
    conn: &C,
    request: &purchasing_requests::Model,
    school_id: i64,
) -> Result<(), PurchasingError> {
    let author = users::Entity::find_by_id(request.user_id)
        .one(conn)
        .await
        .map_err(|e| PurchasingError::Database(e.to_string()))?
        .ok_or(PurchasingError::RequestNotFound(request.request_id))?;

    if author.school_id == Some(school_id) {
        Ok(())
    } else {
        Err(PurchasingError::RequestNotFound(request.request_id))
    }
}

async fn apply_decisions(
    txn: &DatabaseTransaction,
    request_id: i64,
    decisions: &[ItemDecisionInput],
    column: DecisionColumn,
) -> Result<(), PurchasingError> {
    for decision in decisions {
        let item = purchasing_request_items::Entity::find_by_id(decision.item_id)
            .filter(purchasing_request_items::Column::RequestId.eq(request_id))
            .one(txn)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?
            .ok_or(PurchasingError::RequestNotFound(request_id))?;

        let mut active: purchasing_request_items::ActiveModel = item.into();
        let value = Some(decision.decision.as_str().to_string());
        match column {
            DecisionColumn::Moderator => active.mod_decision = Set(value),
            DecisionColumn::Coordinator => active.coordinator_decision = Set(value),
        }
        active
            .update(txn)
            .await
            .map_err(|e| PurchasingError::Database(e.to_string()))?;
    }
    Ok(())
}

/// Recomputes `total_amount` and both aggregate statuses from the items.
///
/// The total keeps full precision while summing and is rounded to two
/// fractional digits at the storage boundary.
async fn recompute_aggregates(
    txn: &DatabaseTransaction,
    request_id: i64,
    scope: StatusScope,
) -> Result<purchasing_requests::Model, PurchasingError> {
    let items = purchasing_request_items::Entity::find()
        .filter(purchasing_request_items::Column::RequestId.eq(request_id))
        .all(txn)
        .await
        .map_err(|e| PurchasingError::Database(e.to_string()))?;

    let decisions: Vec<ItemDecisions> = items
        .iter()
        .map(|i| ItemDecisions {
            total_price: i.total_price,
            mod_decision: i.mod_decision.as_deref().and_then(DecisionValue::parse),
            coordinator_decision: i
                .coordinator_decision
                .as_deref()
                .and_then(DecisionValue::parse),
        })
        .collect();

    let total = PurchasingService::total_amount(&decisions).round_dp(2);

    let request = load_request_on(txn, request_id).await?;
    let mut active: purchasing_requests::ActiveModel = request.into();
    active.total_amount = Set(total);
    if matches!(scope, StatusScope::Moderator | StatusScope::Both) {
        let mod_status =
            PurchasingService::aggregate_status(decisions.iter().map(|d| &d.mod_decision));
        active.mod_status = Set(Some(mod_status.as_str().to_string()));
    }
    if matches!(scope, StatusScope::Coordinator | StatusScope::Both) {
        let coordinator_status = PurchasingService::aggregate_status(
            decisions.iter().map(|d| &d.coordinator_decision),
        );
        active.coordinator_status = Set(Some(coordinator_status.as_str().to_string()));
    }
    active.updated_at = Set(Utc::now().into());

    active
        .update(txn)
        .await
        .map_err(|e| PurchasingError::Database(e.to_string()))
}
