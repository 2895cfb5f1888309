//! Workflow repository for budget-item step advancement.
//!
//! Each decision batch runs in a single transaction: ownership is checked for
//! every targeted item, the advancement plan from the core engine is applied,
//! and touched budgets are conditionally flipped to `review_been_completed`
//! in the same transaction. Any failure rolls the whole batch back.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use tracing::info;

use bursar_core::workflow::{
    Decision, FinalPurchaseStatus, StageKind, StepSnapshot, StepStatus, WorkflowEngine,
    WorkflowError, engine::AdvancePlan,
};

use crate::entities::{budget_items, steps, template_stages};

/// Conditional budget close; the no-current-steps check is re-evaluated
/// inside the UPDATE so concurrent batches cannot race it.
const CLOSE_BUDGET_SQL: &str = r"
UPDATE budgets b
SET budget_status = 'review_been_completed',
    closed_at = COALESCE(b.closed_at, now())
WHERE b.id = $1
  AND b.budget_status = 'in_review'
  AND NOT EXISTS (
      SELECT 1 FROM steps s WHERE s.budget_id = b.id AND s.is_current = 1
  )";

/// A logistics decision for one item.
#[derive(Debug, Clone)]
pub struct LogisticsDecisionInput {
    /// Target item.
    pub item_id: i64,
    /// Quantity found in storage.
    pub provided_qty: Decimal,
}

/// A needed decision for one item. With `needed_status` absent only the
/// notes are stored and the item does not advance.
#[derive(Debug, Clone)]
pub struct NeededDecisionInput {
    /// Target item.
    pub item_id: i64,
    /// 1 needed, 0 not needed; absent records notes only.
    pub needed_status: Option<i16>,
    /// Reviewer notes.
    pub notes: Option<String>,
}

/// A cost decision for one item.
#[derive(Debug, Clone)]
pub struct CostDecisionInput {
    /// Target item.
    pub item_id: i64,
    /// Recorded purchase cost.
    pub purchase_cost: Decimal,
}

/// A coordinator final decision for one item.
#[derive(Debug, Clone)]
pub struct FinalDecisionInput {
    /// Target item.
    pub item_id: i64,
    /// The decision.
    pub status: FinalPurchaseStatus,
    /// Final cost, when adjusted.
    pub final_cost: Option<Decimal>,
    /// Final quantity, when adjusted.
    pub final_quantity: Option<Decimal>,
}

/// Outcome of one committed decision batch.
#[derive(Debug, Clone, Default)]
pub struct DecisionBatchResult {
    /// Items whose step advanced.
    pub advanced_items: usize,
    /// Items already terminal, left untouched.
    pub noop_items: usize,
    /// Budgets touched by the batch (for notification fan-out).
    pub touched_budget_ids: Vec<i64>,
    /// Budgets flipped to `review_been_completed` by this batch.
    pub closed_budget_ids: Vec<i64>,
}

/// An item waiting at a department's stage.
#[derive(Debug, Clone)]
pub struct StageItem {
    /// The waiting item.
    pub item: budget_items::Model,
    /// Name of the current stage.
    pub stage_name: String,
    /// Current step id.
    pub step_id: i64,
}

/// Workflow repository for budget-item step advancement.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists items whose current step is owned by the department.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_stage_items(
        &self,
        department_id: i64,
    ) -> Result<Vec<StageItem>, WorkflowError> {
        let current_steps = steps::Entity::find()
            .filter(steps::Column::OwnerOfStep.eq(department_id))
            .filter(steps::Column::IsCurrent.eq(1i16))
            .order_by_asc(steps::Column::BudgetId)
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut result = Vec::with_capacity(current_steps.len());
        for step in current_steps {
            let item = budget_items::Entity::find_by_id(step.budget_item_id)
                .one(&self.db)
                .await
                .map_err(|e| WorkflowError::Database(e.to_string()))?
                .ok_or(WorkflowError::ItemNotFound(step.budget_item_id))?;
            result.push(StageItem {
                item,
                stage_name: step.step_name,
                step_id: step.id,
            });
        }

        Ok(result)
    }

    /// Records logistics decisions and advances the targeted items.
    ///
    /// # Errors
    ///
    /// Returns an error if any item is missing, owned by another department,
    /// or the database fails; the batch rolls back as a whole.
    pub async fn decide_logistics(
        &self,
        caller_department: i64,
        decisions: Vec<LogisticsDecisionInput>,
    ) -> Result<DecisionBatchResult, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut result = DecisionBatchResult::default();

        for decision in decisions {
            let item = load_item(&txn, decision.item_id).await?;
            let Some(prep) =
                prepare(&txn, &item, caller_department, StageKind::Logistics).await?
            else {
                result.noop_items += 1;
                continue;
            };

            let core_decision = Decision::Logistics {
                provided_qty: decision.provided_qty,
                requested_qty: item.quantity,
            };
            let plan = WorkflowEngine::advance(item.id, &prep.snapshots, &core_decision)?;

            let mut active: budget_items::ActiveModel = item.clone().into();
            active.storage_status = Set(Some(plan.decided_status.as_str().to_string()));
            active.storage_provided_qty = Set(Some(decision.provided_qty));
            apply_plan(&txn, active, &plan).await?;

            track(&mut result, item.budget_id);
        }

        close_completed_budgets(&txn, &mut result).await?;
        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Records needed decisions. Items with only notes supplied are stored
    /// without advancing.
    ///
    /// # Errors
    ///
    /// Returns an error if any item is missing, owned by another department,
    /// or the database fails; the batch rolls back as a whole.
    pub async fn decide_needed(
        &self,
        caller_department: i64,
        decisions: Vec<NeededDecisionInput>,
    ) -> Result<DecisionBatchResult, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut result = DecisionBatchResult::default();

        for decision in decisions {
            let item = load_item(&txn, decision.item_id).await?;

            let Some(needed_status) = decision.needed_status else {
                // Notes only: ownership still applies, but do not advance.
                if prepare(&txn, &item, caller_department, StageKind::Needed)
                    .await?
                    .is_some()
                {
                    let mut active: budget_items::ActiveModel = item.into();
                    active.needed_notes = Set(decision.notes.clone());
                    active
                        .update(&txn)
                        .await
                        .map_err(|e| WorkflowError::Database(e.to_string()))?;
                }
                result.noop_items += 1;
                continue;
            };

            let Some(prep) = prepare(&txn, &item, caller_department, StageKind::Needed).await?
            else {
                result.noop_items += 1;
                continue;
            };

            let core_decision = Decision::Needed {
                needed: needed_status == 1,
            };
            let plan = WorkflowEngine::advance(item.id, &prep.snapshots, &core_decision)?;

            let mut active: budget_items::ActiveModel = item.clone().into();
            active.needed_status = Set(Some(needed_status));
            if decision.notes.is_some() {
                active.needed_notes = Set(decision.notes.clone());
            }
            apply_plan(&txn, active, &plan).await?;

            track(&mut result, item.budget_id);
        }

        close_completed_budgets(&txn, &mut result).await?;
        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Records cost decisions and advances the targeted items.
    ///
    /// # Errors
    ///
    /// Returns an error if any item is missing, owned by another department,
    /// or the database fails; the batch rolls back as a whole.
    pub async fn decide_cost(
        &self,
        caller_department: i64,
        decisions: Vec<CostDecisionInput>,
    ) -> Result<DecisionBatchResult, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut result = DecisionBatchResult::default();

        for decision in decisions {
            let item = load_item(&txn, decision.item_id).await?;
            let Some(prep) = prepare(&txn, &item, caller_department, StageKind::Cost).await?
            else {
                result.noop_items += 1;
                continue;
            };

            let plan = WorkflowEngine::advance(item.id, &prep.snapshots, &Decision::Cost)?;

            let mut active: budget_items::ActiveModel = item.clone().into();
            active.purchase_cost = Set(Some(decision.purchase_cost));
            apply_plan(&txn, active, &plan).await?;

            track(&mut result, item.budget_id);
        }

        close_completed_budgets(&txn, &mut result).await?;
        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Records coordinator final decisions and advances the targeted items.
    ///
    /// # Errors
    ///
    /// Returns an error if any item is missing, owned by another department,
    /// or the database fails; the batch rolls back as a whole.
    pub async fn decide_final(
        &self,
        caller_department: i64,
        decisions: Vec<FinalDecisionInput>,
    ) -> Result<DecisionBatchResult, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let mut result = DecisionBatchResult::default();

        for decision in decisions {
            let item = load_item(&txn, decision.item_id).await?;
            let Some(prep) =
                prepare(&txn, &item, caller_department, StageKind::Coordinator).await?
            else {
                result.noop_items += 1;
                continue;
            };

            let core_decision = Decision::Final {
                status: decision.status,
            };
            let plan = WorkflowEngine::advance(item.id, &prep.snapshots, &core_decision)?;

            let mut active: budget_items::ActiveModel = item.clone().into();
            active.final_purchase_status = Set(Some(decision.status.as_str().to_string()));
            active.final_purchase_cost = Set(decision.final_cost);
            active.final_quantity = Set(decision.final_quantity);
            apply_plan(&txn, active, &plan).await?;

            track(&mut result, item.budget_id);
        }

        close_completed_budgets(&txn, &mut result).await?;
        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Sends an item back for revision from a stage that allows it.
    ///
    /// Step advancement is not triggered; the item keeps its current step.
    ///
    /// # Errors
    ///
    /// Returns an error if the reason is empty, the caller does not own the
    /// current step, or the stage's template row disallows revising.
    pub async fn revise_back(
        &self,
        caller_department: i64,
        item_id: i64,
        reason: &str,
    ) -> Result<budget_items::Model, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::ReviseReasonRequired);
        }

        let item = load_item(&self.db, item_id).await?;
        let step_models = load_steps(&self.db, item_id).await?;
        let snapshots = to_snapshots(&step_models);

        let current = WorkflowEngine::current_step(item_id, &snapshots)?;
        WorkflowEngine::require_owner(item_id, current, caller_department)?;

        if !allow_revise(&self.db, &item, current).await? {
            return Err(WorkflowError::ReviseNotAllowed {
                item_id,
                stage: current.step_name.clone(),
            });
        }

        let mut active: budget_items::ActiveModel = item.into();
        active.revision_state = Set("pending".to_string());
        active.revise_reason = Set(Some(reason.to_string()));
        active.revised_at = Set(Some(Utc::now().into()));

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        info!(item_id, department_id = caller_department, "item sent back for revision");
        Ok(updated)
    }
}

// ============================================================================
// Batch helpers
// ============================================================================

struct Prepared {
    snapshots: Vec<StepSnapshot>,
}

/// Loads the item's steps and runs ownership and stage checks.
///
/// Returns `Ok(None)` when the decision is a no-op: the item is already
/// terminal, or the targeted stage was already decided or skipped (a repeat
/// of an identical batch).
async fn prepare<C: ConnectionTrait>(
    conn: &C,
    item: &budget_items::Model,
    caller_department: i64,
    stage: StageKind,
) -> Result<Option<Prepared>, WorkflowError> {
    if item.workflow_done {
        return Ok(None);
    }

    let step_models = load_steps(conn, item.id).await?;
    let snapshots = to_snapshots(&step_models);

    let current = WorkflowEngine::current_step(item.id, &snapshots)?;

    if StageKind::classify(&current.step_name) != stage {
        // Repeated batch: the stage already carries a terminal status.
        let already_decided = snapshots
            .iter()
            .any(|s| StageKind::classify(&s.step_name) == stage && s.status.is_terminal());
        if already_decided {
            return Ok(None);
        }
        return Err(WorkflowError::StageMismatch {
            item_id: item.id,
            stage: current.step_name.clone(),
            expected: stage,
        });
    }

    WorkflowEngine::require_owner(item.id, current, caller_department)?;

    Ok(Some(Prepared { snapshots }))
}

async fn load_item<C: ConnectionTrait>(
    conn: &C,
    item_id: i64,
) -> Result<budget_items::Model, WorkflowError> {
    budget_items::Entity::find_by_id(item_id)
        .one(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?
        .ok_or(WorkflowError::ItemNotFound(item_id))
}

async fn load_steps<C: ConnectionTrait>(
    conn: &C,
    item_id: i64,
) -> Result<Vec<steps::Model>, WorkflowError> {
    steps::Entity::find()
        .filter(steps::Column::BudgetItemId.eq(item_id))
        .order_by_asc(steps::Column::SortOrder)
        .all(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))
}

fn to_snapshots(models: &[steps::Model]) -> Vec<StepSnapshot> {
    models
        .iter()
        .map(|m| StepSnapshot {
            id: m.id,
            step_name: m.step_name.clone(),
            sort_order: m.sort_order,
            owner_of_step: m.owner_of_step,
            status: StepStatus::parse(&m.step_status).unwrap_or(StepStatus::Pending),
            is_current: m.is_current == 1,
        })
        .collect()
}

/// Writes the advancement plan: the decided step, skipped steps, the new
/// current step, and the item's mirrored columns.
async fn apply_plan(
    txn: &DatabaseTransaction,
    mut item_active: budget_items::ActiveModel,
    plan: &AdvancePlan,
) -> Result<(), WorkflowError> {
    let now = Utc::now();

    let decided = steps::ActiveModel {
        id: Set(plan.decided_step_id),
        step_status: Set(plan.decided_status.as_str().to_string()),
        is_current: Set(0),
        updated_at: Set(now.into()),
        ..Default::default()
    };
    decided
        .update(txn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    for &step_id in &plan.skipped_step_ids {
        let skipped = steps::ActiveModel {
            id: Set(step_id),
            step_status: Set(StepStatus::Skipped.as_str().to_string()),
            is_current: Set(0),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        skipped
            .update(txn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;
    }

    if let Some(next) = &plan.next_step {
        let activated = steps::ActiveModel {
            id: Set(next.id),
            is_current: Set(1),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        activated
            .update(txn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;
    }

    match &plan.next_step {
        Some(next) => {
            item_active.current_step_id = Set(Some(next.id));
            item_active.current_stage = Set(Some(next.step_name.clone()));
            item_active.current_step_order = Set(Some(next.sort_order));
            item_active.current_owner_department_id = Set(Some(next.owner_of_step));
        }
        None => {
            item_active.current_step_id = Set(None);
            item_active.current_stage = Set(None);
            item_active.current_step_order = Set(None);
            item_active.current_owner_department_id = Set(None);
        }
    }
    match &plan.upcoming_step {
        Some(upcoming) => {
            item_active.next_step_id = Set(Some(upcoming.id));
            item_active.next_stage = Set(Some(upcoming.step_name.clone()));
            item_active.next_owner_department_id = Set(Some(upcoming.owner_of_step));
        }
        None => {
            item_active.next_step_id = Set(None);
            item_active.next_stage = Set(None);
            item_active.next_owner_department_id = Set(None);
        }
    }
    item_active.workflow_done = Set(plan.workflow_done);

    item_active
        .update(txn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(())
}

fn track(result: &mut DecisionBatchResult, budget_id: i64) {
    result.advanced_items += 1;
    if !result.touched_budget_ids.contains(&budget_id) {
        result.touched_budget_ids.push(budget_id);
    }
}

/// Flips every touched budget that has no current steps left.
async fn close_completed_budgets(
    txn: &DatabaseTransaction,
    result: &mut DecisionBatchResult,
) -> Result<(), WorkflowError> {
    for &budget_id in &result.touched_budget_ids {
        let exec = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                CLOSE_BUDGET_SQL,
                [budget_id.into()],
            ))
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if exec.rows_affected() > 0 {
            result.closed_budget_ids.push(budget_id);
            info!(budget_id, "budget review completed");
        }
    }
    Ok(())
}

/// Looks up `allow_revise` on the template stage the current step was
/// materialized from.
async fn allow_revise<C: ConnectionTrait>(
    conn: &C,
    item: &budget_items::Model,
    current: &StepSnapshot,
) -> Result<bool, WorkflowError> {
    let Some(template_id) = item.route_template_id else {
        return Ok(false);
    };

    let stage = template_stages::Entity::find()
        .filter(template_stages::Column::TemplateId.eq(template_id))
        .filter(template_stages::Column::SortOrder.eq(current.sort_order))
        .one(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

    Ok(stage.is_some_and(|s| s.allow_revise))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i64, name: &str, sort_order: i32, status: &str, is_current: i16) -> steps::Model {
        steps::Model {
            id,
            budget_id: 1,
            budget_item_id: 1,
            account_id: 1,
            step_name: name.to_string(),
            sort_order,
            owner_of_step: 10,
            step_status: status.to_string(),
            is_current,
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_snapshot_conversion() {
        let models = vec![
            model(1, "logistics", 1, "in_stock", 0),
            model(2, "needed", 2, "pending", 1),
        ];
        let snapshots = to_snapshots(&models);

        assert_eq!(snapshots[0].status, StepStatus::InStock);
        assert!(!snapshots[0].is_current);
        assert_eq!(snapshots[1].status, StepStatus::Pending);
        assert!(snapshots[1].is_current);
    }

    #[test]
    fn test_snapshot_conversion_defaults_unknown_status_to_pending() {
        let models = vec![model(1, "logistics", 1, "mystery", 1)];
        let snapshots = to_snapshots(&models);
        assert_eq!(snapshots[0].status, StepStatus::Pending);
    }
}
