//! Revision repository: the ledger of items sent back for revision.
//!
//! Listings join each flagged item with its latest answer and expose aging
//! since the last activity; the summary buckets that aging.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use thiserror::Error;
use tracing::info;

use bursar_core::revision::{AgingSummary, RevisionError, RevisionState, aging_days, answer};

use crate::entities::{budget_items, budgets, revision_answers, users};

/// Errors raised by revision ledger operations.
#[derive(Debug, Error)]
pub enum RevisionRepoError {
    /// Item not found or not under revision.
    #[error("Budget item {0} not found")]
    ItemNotFound(i64),

    /// Transition validation failed.
    #[error(transparent)]
    Invalid(#[from] RevisionError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl RevisionRepoError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ItemNotFound(_) => 404,
            Self::Invalid(_) => 400,
            Self::Database(_) => 500,
        }
    }
}

/// Filters for the revision ledger.
#[derive(Debug, Clone, Default)]
pub struct RevisionFilter {
    /// Budget period, "MM-YYYY".
    pub period: Option<String>,
    /// School of the budget.
    pub school_id: Option<i64>,
    /// Sub-account of the item.
    pub account_id: Option<i64>,
    /// Budget author.
    pub assignee_id: Option<i64>,
    /// Restrict to schools whose users have `budget_mod` = this moderator.
    pub moderator_id: Option<i64>,
}

/// One row of the revision ledger.
#[derive(Debug, Clone)]
pub struct RevisionRow {
    /// The flagged item.
    pub item: budget_items::Model,
    /// Budget the item belongs to.
    pub budget_id: i64,
    /// Budget period.
    pub period: String,
    /// School of the budget.
    pub school_id: i64,
    /// Latest answer text, if any.
    pub revision_answer: Option<String>,
    /// When the latest answer was given.
    pub revision_answered_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Days since the last activity.
    pub aging_days: i64,
}

/// Revision repository.
#[derive(Debug, Clone)]
pub struct RevisionRepository {
    db: DatabaseConnection,
}

impl RevisionRepository {
    /// Creates a new revision repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists flagged items with their latest answers and aging.
    ///
    /// Items already carrying a final purchase decision are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: &RevisionFilter) -> Result<Vec<RevisionRow>, RevisionRepoError> {
        let mut scoped_schools: Option<Vec<i64>> = None;
        if let Some(moderator_id) = filter.moderator_id {
            let schools: Vec<i64> = users::Entity::find()
                .filter(users::Column::BudgetMod.eq(moderator_id))
                .all(&self.db)
                .await
                .map_err(|e| RevisionRepoError::Database(e.to_string()))?
                .into_iter()
                .filter_map(|u| u.school_id)
                .collect();
            scoped_schools = Some(schools);
        }

        let mut budget_query = budgets::Entity::find();
        if let Some(period) = &filter.period {
            budget_query = budget_query.filter(budgets::Column::Period.eq(period.clone()));
        }
        if let Some(school_id) = filter.school_id {
            budget_query = budget_query.filter(budgets::Column::SchoolId.eq(school_id));
        }
        if let Some(assignee_id) = filter.assignee_id {
            budget_query = budget_query.filter(budgets::Column::UserId.eq(assignee_id));
        }
        if let Some(schools) = &scoped_schools {
            if schools.is_empty() {
                return Ok(Vec::new());
            }
            budget_query = budget_query.filter(budgets::Column::SchoolId.is_in(schools.clone()));
        }

        let budget_rows = budget_query
            .all(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?;
        if budget_rows.is_empty() {
            return Ok(Vec::new());
        }
        let budget_ids: Vec<i64> = budget_rows.iter().map(|b| b.id).collect();

        let mut item_query = budget_items::Entity::find()
            .filter(budget_items::Column::BudgetId.is_in(budget_ids.clone()))
            .filter(budget_items::Column::RevisionState.is_in(["pending", "answered", "resolved"]))
            .filter(budget_items::Column::FinalPurchaseStatus.is_null());
        if let Some(account_id) = filter.account_id {
            item_query = item_query.filter(budget_items::Column::AccountId.eq(account_id));
        }

        let items = item_query
            .order_by_asc(budget_items::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let answers = revision_answers::Entity::find()
            .filter(revision_answers::Column::ItemId.is_in(item_ids))
            .order_by_desc(revision_answers::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?;

        let now = Utc::now();
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let budget = budget_rows
                .iter()
                .find(|b| b.id == item.budget_id)
                .ok_or(RevisionRepoError::ItemNotFound(item.id))?;

            // Answers are ordered newest-first; the first match wins.
            let latest = answers
                .iter()
                .find(|a| a.budget_id == item.budget_id && a.item_id == item.id);

            let revised_at = item.revised_at.map(Into::into).unwrap_or(now);
            let answered_at = latest.map(|a| a.created_at.into());

            rows.push(RevisionRow {
                budget_id: item.budget_id,
                period: budget.period.clone(),
                school_id: budget.school_id,
                revision_answer: latest.map(|a| a.answer_text.clone()),
                revision_answered_at: answered_at,
                aging_days: aging_days(now, revised_at, answered_at),
                item,
            });
        }

        Ok(rows)
    }

    /// Buckets the filtered ledger into the aging summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn summary(
        &self,
        filter: &RevisionFilter,
    ) -> Result<AgingSummary, RevisionRepoError> {
        let rows = self.list(filter).await?;
        Ok(AgingSummary::from_days(rows.iter().map(|r| r.aging_days)))
    }

    /// Appends an author answer and flips the item to `answered`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is unknown, not under revision, or the
    /// text is empty.
    pub async fn submit_answer(
        &self,
        budget_id: i64,
        item_id: i64,
        author_id: i64,
        answer_text: &str,
    ) -> Result<revision_answers::Model, RevisionRepoError> {
        let item = budget_items::Entity::find_by_id(item_id)
            .filter(budget_items::Column::BudgetId.eq(budget_id))
            .one(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?
            .ok_or(RevisionRepoError::ItemNotFound(item_id))?;

        let state = RevisionState::parse(&item.revision_state).unwrap_or(RevisionState::None);
        let next = answer(item_id, state, answer_text)?;

        let row = revision_answers::ActiveModel {
            budget_id: Set(budget_id),
            item_id: Set(item_id),
            answer_text: Set(answer_text.to_string()),
            created_at: Set(Utc::now().into()),
            author_id: Set(author_id),
            ..Default::default()
        };
        let row = row
            .insert(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?;

        let mut active: budget_items::ActiveModel = item.into();
        active.revision_state = Set(next.as_str().to_string());
        active
            .update(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?;

        info!(budget_id, item_id, author_id, "revision answered");
        Ok(row)
    }

    /// Closes out a revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is unknown or the database fails.
    pub async fn resolve(&self, item_id: i64) -> Result<budget_items::Model, RevisionRepoError> {
        let item = budget_items::Entity::find_by_id(item_id)
            .one(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))?
            .ok_or(RevisionRepoError::ItemNotFound(item_id))?;

        let mut active: budget_items::ActiveModel = item.into();
        active.revision_state = Set(RevisionState::Resolved.as_str().to_string());
        active
            .update(&self.db)
            .await
            .map_err(|e| RevisionRepoError::Database(e.to_string()))
    }
}
