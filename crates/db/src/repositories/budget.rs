//! Budget repository: drafts, items, and submission.
//!
//! Submission resolves the workflow template per item, materializes its step
//! ledger, and flips the budget to `in_review`, all in one transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use thiserror::Error;
use tracing::info;

use bursar_core::template::{Binding, Stage, TemplateError, TemplateStore};

use crate::entities::{budget_items, budgets, steps, template_stages, workflow_bindings};

/// Errors raised by budget operations.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Budget not found or outside the caller's scope.
    #[error("Budget {0} not found")]
    NotFound(i64),

    /// Submission requires a draft budget.
    #[error("Budget {0} is not a draft")]
    NotDraft(i64),

    /// A draft cannot be submitted without items.
    #[error("Budget {0} has no items")]
    Empty(i64),

    /// No workflow template is bound for an item's school and account.
    #[error("No workflow template bound for school {school_id}, account {account_id}")]
    NoTemplateBound {
        /// School of the budget.
        school_id: i64,
        /// Sub-account of the item.
        account_id: i64,
    },

    /// The bound template failed materialization.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl BudgetError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::NoTemplateBound { .. } => 404,
            Self::NotDraft(_) | Self::Empty(_) | Self::Template(_) => 400,
            Self::Database(_) => 500,
        }
    }
}

/// Input for one item of a new budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetItemInput {
    /// Sub-account of the item.
    pub account_id: i64,
    /// Catalog item reference, if any.
    pub item_id: Option<i64>,
    /// Item name.
    pub item_name: String,
    /// Item description.
    pub itemdescription: Option<String>,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Estimated unit cost.
    pub cost: Decimal,
    /// Unit label.
    pub unit: String,
    /// Months the quantity covers.
    pub period_months: i32,
    /// Author notes.
    pub notes: Option<String>,
}

/// Input for a new budget draft.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// Budget period, "MM-YYYY".
    pub period: String,
    /// Budget title.
    pub title: String,
    /// Budget description.
    pub description: Option<String>,
    /// Request type.
    pub request_type: String,
    /// Initial items.
    pub items: Vec<CreateBudgetItemInput>,
}

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a draft budget with its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the database fails.
    pub async fn create_budget(
        &self,
        user_id: i64,
        school_id: i64,
        input: CreateBudgetInput,
    ) -> Result<budgets::Model, BudgetError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        let budget = budgets::ActiveModel {
            user_id: Set(user_id),
            school_id: Set(school_id),
            period: Set(input.period),
            title: Set(input.title),
            description: Set(input.description),
            request_type: Set(input.request_type),
            budget_status: Set("draft".to_string()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let budget = budget
            .insert(&txn)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        for item in input.items {
            insert_item(&txn, budget.id, item).await?;
        }

        txn.commit()
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        info!(budget_id = budget.id, user_id, "budget draft created");
        Ok(budget)
    }

    /// Lists a user's budgets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<budgets::Model>, BudgetError> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))
    }

    /// Loads one budget with its items, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` outside the owner's scope.
    pub async fn get_for_user(
        &self,
        budget_id: i64,
        user_id: i64,
    ) -> Result<(budgets::Model, Vec<budget_items::Model>), BudgetError> {
        let budget = budgets::Entity::find_by_id(budget_id)
            .filter(budgets::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?
            .ok_or(BudgetError::NotFound(budget_id))?;

        let items = budget_items::Entity::find()
            .filter(budget_items::Column::BudgetId.eq(budget_id))
            .order_by_asc(budget_items::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        Ok((budget, items))
    }

    /// Submits a draft: materializes each item's step ledger from the
    /// resolved template and flips the budget to `in_review`.
    ///
    /// # Errors
    ///
    /// Returns an error if the budget is not the caller's draft, an item has
    /// no bound template, or the database fails; nothing is materialized on
    /// failure.
    pub async fn submit_budget(
        &self,
        budget_id: i64,
        user_id: i64,
    ) -> Result<budgets::Model, BudgetError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        let budget = budgets::Entity::find_by_id(budget_id)
            .filter(budgets::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?
            .ok_or(BudgetError::NotFound(budget_id))?;

        if budget.budget_status != "draft" {
            return Err(BudgetError::NotDraft(budget_id));
        }

        let items = budget_items::Entity::find()
            .filter(budget_items::Column::BudgetId.eq(budget_id))
            .order_by_asc(budget_items::Column::Id)
            .all(&txn)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        if items.is_empty() {
            return Err(BudgetError::Empty(budget_id));
        }

        for item in &items {
            materialize_item(&txn, &budget, item).await?;
        }

        let mut active: budgets::ActiveModel = budget.into();
        active.budget_status = Set("in_review".to_string());
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;

        info!(budget_id, item_count = items.len(), "budget submitted for review");
        Ok(updated)
    }
}

async fn insert_item(
    txn: &sea_orm::DatabaseTransaction,
    budget_id: i64,
    item: CreateBudgetItemInput,
) -> Result<budget_items::Model, BudgetError> {
    let row = budget_items::ActiveModel {
        budget_id: Set(budget_id),
        account_id: Set(item.account_id),
        item_id: Set(item.item_id),
        item_name: Set(item.item_name),
        itemdescription: Set(item.itemdescription),
        quantity: Set(item.quantity),
        cost: Set(item.cost),
        unit: Set(item.unit),
        period_months: Set(item.period_months),
        notes: Set(item.notes),
        workflow_done: Set(false),
        revision_state: Set("none".to_string()),
        ..Default::default()
    };

    row.insert(txn)
        .await
        .map_err(|e| BudgetError::Database(e.to_string()))
}

/// Copies the resolved template's stages into the item's step ledger; the
/// first step becomes current and the item mirrors the first two steps.
async fn materialize_item(
    txn: &sea_orm::DatabaseTransaction,
    budget: &budgets::Model,
    item: &budget_items::Model,
) -> Result<(), BudgetError> {
    let bindings = workflow_bindings::Entity::find()
        .filter(workflow_bindings::Column::SchoolId.eq(budget.school_id))
        .filter(workflow_bindings::Column::AccountId.eq(item.account_id))
        .all(txn)
        .await
        .map_err(|e| BudgetError::Database(e.to_string()))?;

    let candidates: Vec<Binding> = bindings
        .into_iter()
        .map(|b| Binding {
            template_id: b.template_id,
            priority: b.priority,
            created_at: b.created_at.into(),
        })
        .collect();

    let template_id =
        TemplateStore::resolve_binding(&candidates).ok_or(BudgetError::NoTemplateBound {
            school_id: budget.school_id,
            account_id: item.account_id,
        })?;

    let stage_rows = template_stages::Entity::find()
        .filter(template_stages::Column::TemplateId.eq(template_id))
        .order_by_asc(template_stages::Column::SortOrder)
        .all(txn)
        .await
        .map_err(|e| BudgetError::Database(e.to_string()))?;

    let stages: Vec<Stage> = stage_rows
        .into_iter()
        .map(|s| Stage {
            stage_name: s.stage_name,
            sort_order: s.sort_order,
            owner_department_id: s.owner_department_id,
            allow_revise: s.allow_revise,
        })
        .collect();

    let protos = TemplateStore::materialize(template_id, &stages)?;
    let now = Utc::now();

    let mut inserted = Vec::with_capacity(protos.len());
    for proto in &protos {
        let row = steps::ActiveModel {
            budget_id: Set(budget.id),
            budget_item_id: Set(item.id),
            account_id: Set(item.account_id),
            step_name: Set(proto.step_name.clone()),
            sort_order: Set(proto.sort_order),
            owner_of_step: Set(proto.owner_of_step),
            step_status: Set(proto.status.as_str().to_string()),
            is_current: Set(i16::from(proto.is_current)),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let row = row
            .insert(txn)
            .await
            .map_err(|e| BudgetError::Database(e.to_string()))?;
        inserted.push(row);
    }

    let first = &inserted[0];
    let second = inserted.get(1);

    let mut active: budget_items::ActiveModel = item.clone().into();
    active.route_template_id = Set(Some(template_id));
    active.current_step_id = Set(Some(first.id));
    active.current_stage = Set(Some(first.step_name.clone()));
    active.current_step_order = Set(Some(first.sort_order));
    active.current_owner_department_id = Set(Some(first.owner_of_step));
    active.next_step_id = Set(second.map(|s| s.id));
    active.next_stage = Set(second.map(|s| s.step_name.clone()));
    active.next_owner_department_id = Set(second.map(|s| s.owner_of_step));
    active
        .update(txn)
        .await
        .map_err(|e| BudgetError::Database(e.to_string()))?;

    Ok(())
}
