//! Stage-waiting mail adapter.
//!
//! Receives coalesced batches from the notification fan-out, resolves the
//! departments now owning current steps in the touched budgets, and emails
//! each one. Everything here is post-commit: failures are logged, never
//! surfaced.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, warn};

use bursar_db::entities::{departments, steps};
use bursar_shared::email::{EmailError, EmailService};
use bursar_shared::notify::{StageWaitingBatch, StageWaitingSink};

/// Mail adapter for stage-waiting notifications.
pub struct StageMailer {
    db: Arc<DatabaseConnection>,
    email: Arc<EmailService>,
}

impl StageMailer {
    /// Creates a new mail adapter.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, email: Arc<EmailService>) -> Self {
        Self { db, email }
    }

    async fn deliver_batch(&self, batch: StageWaitingBatch) -> Result<(), EmailError> {
        if batch.budget_ids.is_empty() {
            debug!(hints = batch.item_hints.len(), "needed-stage hints only, nothing to mail");
            return Ok(());
        }

        // Departments owning a current step in any touched budget.
        let current_steps = steps::Entity::find()
            .filter(steps::Column::BudgetId.is_in(batch.budget_ids.clone()))
            .filter(steps::Column::IsCurrent.eq(1i16))
            .all(self.db.as_ref())
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        let department_ids: BTreeSet<i64> =
            current_steps.iter().map(|s| s.owner_of_step).collect();
        if department_ids.is_empty() {
            return Ok(());
        }

        let recipients = departments::Entity::find()
            .filter(departments::Column::Id.is_in(department_ids))
            .filter(departments::Column::Active.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        for department in recipients {
            let Some(address) = department.notify_email.as_deref() else {
                continue;
            };
            if let Err(e) = self
                .email
                .send_stage_waiting(address, &department.name, batch.budget_ids.len())
                .await
            {
                warn!(
                    department_id = department.id,
                    error = %e,
                    "stage-waiting mail failed"
                );
            }
        }

        Ok(())
    }
}

impl StageWaitingSink for StageMailer {
    fn deliver(
        &self,
        batch: StageWaitingBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmailError>> + Send + '_>> {
        Box::pin(self.deliver_batch(batch))
    }
}
