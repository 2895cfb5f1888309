//! Assignment repository for control-area ownership.
//!
//! `sync_for_department` materializes the target cross product in memory,
//! diffs it against the stored rows via the core planner, and applies the
//! three diffs inside one transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;

use bursar_core::assignment::{
    AreaOwners, AssignmentError, ControlArea, ExistingAssignment, SyncMode, SyncReport,
    sync::plan_sync,
};

use crate::entities::{
    control_assignments, department_accounts, department_areas, department_schools, departments,
};

/// Assignment repository.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    db: DatabaseConnection,
}

impl AssignmentRepository {
    /// Creates a new assignment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the department owning one control area for (school, account).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn owner(
        &self,
        school_id: i64,
        account_id: i64,
        area: ControlArea,
    ) -> Result<Option<i64>, AssignmentError> {
        let row = control_assignments::Entity::find()
            .filter(control_assignments::Column::SchoolId.eq(school_id))
            .filter(control_assignments::Column::AccountId.eq(account_id))
            .filter(control_assignments::Column::ControlArea.eq(area.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?;

        Ok(row.map(|r| r.department_id))
    }

    /// Returns the owners of all three areas for (school, account).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn owners(
        &self,
        school_id: i64,
        account_id: i64,
    ) -> Result<AreaOwners, AssignmentError> {
        let rows = control_assignments::Entity::find()
            .filter(control_assignments::Column::SchoolId.eq(school_id))
            .filter(control_assignments::Column::AccountId.eq(account_id))
            .all(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?;

        let mut owners = AreaOwners::default();
        for row in rows {
            if let Some(area) = ControlArea::parse(&row.control_area) {
                owners.set(area, row.department_id);
            }
        }
        Ok(owners)
    }

    /// Rewrites a department's assignments to its assigned
    /// schools × accounts × areas.
    ///
    /// In strict mode any target row owned by another department fails the
    /// sync with the conflict list and nothing changes. In replace mode
    /// conflicting rows are transferred. Missing rows are inserted and rows
    /// the department owns outside the target are deleted, all in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `Conflicts` in strict mode, `DepartmentNotFound` for an
    /// unknown department, or `Database` on failures.
    pub async fn sync_for_department(
        &self,
        department_id: i64,
        mode: SyncMode,
    ) -> Result<SyncReport, AssignmentError> {
        departments::Entity::find_by_id(department_id)
            .one(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?
            .ok_or(AssignmentError::DepartmentNotFound(department_id))?;

        let schools: Vec<i64> = department_schools::Entity::find()
            .filter(department_schools::Column::DepartmentId.eq(department_id))
            .all(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?
            .into_iter()
            .map(|r| r.school_id)
            .collect();

        let accounts: Vec<i64> = department_accounts::Entity::find()
            .filter(department_accounts::Column::DepartmentId.eq(department_id))
            .all(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?
            .into_iter()
            .map(|r| r.account_id)
            .collect();

        let areas: Vec<ControlArea> = department_areas::Entity::find()
            .filter(department_areas::Column::DepartmentId.eq(department_id))
            .all(&self.db)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?
            .into_iter()
            .filter_map(|r| ControlArea::parse(&r.control_area))
            .collect();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?;

        // Rows in the target scope plus everything this department owns.
        let mut scope = Condition::any()
            .add(control_assignments::Column::DepartmentId.eq(department_id));
        if !schools.is_empty() && !accounts.is_empty() && !areas.is_empty() {
            scope = scope.add(
                Condition::all()
                    .add(control_assignments::Column::SchoolId.is_in(schools.clone()))
                    .add(control_assignments::Column::AccountId.is_in(accounts.clone()))
                    .add(
                        control_assignments::Column::ControlArea
                            .is_in(areas.iter().map(ControlArea::as_str)),
                    ),
            );
        }

        let existing: Vec<ExistingAssignment> = control_assignments::Entity::find()
            .filter(scope)
            .all(&txn)
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?
            .into_iter()
            .filter_map(|r| {
                ControlArea::parse(&r.control_area).map(|area| ExistingAssignment {
                    id: r.id,
                    school_id: r.school_id,
                    account_id: r.account_id,
                    control_area: area,
                    department_id: r.department_id,
                })
            })
            .collect();

        let plan = plan_sync(department_id, &schools, &accounts, &areas, &existing, mode)?;

        for &(school_id, account_id, area) in &plan.insert {
            let row = control_assignments::ActiveModel {
                school_id: Set(school_id),
                account_id: Set(account_id),
                control_area: Set(area.as_str().to_string()),
                department_id: Set(department_id),
                ..Default::default()
            };
            row.insert(&txn)
                .await
                .map_err(|e| AssignmentError::Database(e.to_string()))?;
        }

        for &row_id in &plan.transfer {
            let row = control_assignments::ActiveModel {
                id: Set(row_id),
                department_id: Set(department_id),
                ..Default::default()
            };
            row.update(&txn)
                .await
                .map_err(|e| AssignmentError::Database(e.to_string()))?;
        }

        if !plan.delete.is_empty() {
            control_assignments::Entity::delete_many()
                .filter(control_assignments::Column::Id.is_in(plan.delete.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AssignmentError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AssignmentError::Database(e.to_string()))?;

        let report = plan.report();
        info!(
            department_id,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            "control assignments synced"
        );

        Ok(report)
    }
}
