//! Sync diff planning for control assignments.
//!
//! The target set is the cross product S × A × C of a department's assigned
//! schools, accounts, and areas. The planner diffs that target against the
//! rows currently stored and emits the exact inserts, transfers, and deletes
//! the repository must apply in one transaction.

use std::collections::{BTreeMap, BTreeSet};

use super::{AssignmentError, Conflict, ControlArea};

/// Identity of one assignment row: (school, account, area).
pub type AssignmentKey = (i64, i64, ControlArea);

/// A stored `control_assignments` row, as loaded for planning.
///
/// The repository passes every row that either matches a target key or is
/// owned by the syncing department.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingAssignment {
    /// Row id.
    pub id: i64,
    /// School of the row.
    pub school_id: i64,
    /// Account of the row.
    pub account_id: i64,
    /// Area of the row.
    pub control_area: ControlArea,
    /// Owning department.
    pub department_id: i64,
}

impl ExistingAssignment {
    const fn key(&self) -> AssignmentKey {
        (self.school_id, self.account_id, self.control_area)
    }
}

/// Conflict handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Fail on any row owned by another department; mutate nothing.
    Strict,
    /// Transfer conflicting rows to the syncing department.
    Replace,
}

impl SyncMode {
    /// Parses a mode from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }
}

/// The diff a sync must apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Keys to insert for the syncing department.
    pub insert: Vec<AssignmentKey>,
    /// Row ids to transfer to the syncing department (replace mode only).
    pub transfer: Vec<i64>,
    /// Row ids owned by the syncing department to delete.
    pub delete: Vec<i64>,
}

impl SyncPlan {
    /// True when the plan changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.insert.is_empty() && self.transfer.is_empty() && self.delete.is_empty()
    }

    /// Summarizes the plan as the counts the caller reports.
    #[must_use]
    pub fn report(&self) -> SyncReport {
        SyncReport {
            inserted: self.insert.len(),
            updated: self.transfer.len(),
            deleted: self.delete.len(),
            conflicts: Vec::new(),
        }
    }
}

/// Counts reported after a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows transferred from other departments.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
    /// Conflicts found (only populated on strict-mode failure).
    pub conflicts: Vec<Conflict>,
}

/// Computes the sync diff for a department.
///
/// An empty schools, accounts, or areas set empties the target: every row the
/// department owns is deleted and nothing is inserted. That is the contract
/// for departments with no assignments, not an error.
///
/// # Errors
///
/// Returns `AssignmentError::Conflicts` in strict mode when any target key is
/// owned by a different department; the plan mutates nothing in that case.
pub fn plan_sync(
    department_id: i64,
    schools: &[i64],
    accounts: &[i64],
    areas: &[ControlArea],
    existing: &[ExistingAssignment],
    mode: SyncMode,
) -> Result<SyncPlan, AssignmentError> {
    let mut target: BTreeSet<AssignmentKey> = BTreeSet::new();
    for &school in schools {
        for &account in accounts {
            for &area in areas {
                target.insert((school, account, area));
            }
        }
    }

    let by_key: BTreeMap<AssignmentKey, &ExistingAssignment> =
        existing.iter().map(|row| (row.key(), row)).collect();

    let mut conflicts = Vec::new();
    let mut transfer = Vec::new();
    let mut insert = Vec::new();

    for &key in &target {
        match by_key.get(&key) {
            Some(row) if row.department_id == department_id => {}
            Some(row) => {
                conflicts.push(Conflict {
                    school_id: key.0,
                    account_id: key.1,
                    control_area: key.2,
                    owner_department_id: row.department_id,
                });
                transfer.push(row.id);
            }
            None => insert.push(key),
        }
    }

    if mode == SyncMode::Strict && !conflicts.is_empty() {
        return Err(AssignmentError::Conflicts(conflicts));
    }

    let delete: Vec<i64> = existing
        .iter()
        .filter(|row| row.department_id == department_id && !target.contains(&row.key()))
        .map(|row| row.id)
        .collect();

    Ok(SyncPlan {
        insert,
        transfer,
        delete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, school: i64, account: i64, area: ControlArea, dept: i64) -> ExistingAssignment {
        ExistingAssignment {
            id,
            school_id: school,
            account_id: account,
            control_area: area,
            department_id: dept,
        }
    }

    #[test]
    fn test_fresh_sync_inserts_full_product() {
        let plan = plan_sync(
            5,
            &[1, 2],
            &[100],
            &[ControlArea::Logistics, ControlArea::Cost],
            &[],
            SyncMode::Strict,
        )
        .unwrap();

        assert_eq!(plan.insert.len(), 4);
        assert!(plan.transfer.is_empty());
        assert!(plan.delete.is_empty());
        assert_eq!(plan.report().inserted, 4);
    }

    #[test]
    fn test_strict_conflict_fails_without_mutation() {
        let existing = vec![row(9, 1, 100, ControlArea::Logistics, 7)];
        let result = plan_sync(
            5,
            &[1],
            &[100],
            &[ControlArea::Logistics],
            &existing,
            SyncMode::Strict,
        );

        match result {
            Err(AssignmentError::Conflicts(conflicts)) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].owner_department_id, 7);
                assert_eq!(conflicts[0].control_area, ControlArea::Logistics);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_replace_transfers_exactly_the_conflicts() {
        let existing = vec![
            row(9, 1, 100, ControlArea::Logistics, 7),
            row(10, 1, 100, ControlArea::Needed, 5),
        ];
        let plan = plan_sync(
            5,
            &[1],
            &[100],
            &[ControlArea::Logistics, ControlArea::Needed, ControlArea::Cost],
            &existing,
            SyncMode::Replace,
        )
        .unwrap();

        assert_eq!(plan.transfer, vec![9]);
        assert_eq!(plan.insert, vec![(1, 100, ControlArea::Cost)]);
        assert!(plan.delete.is_empty());
        assert_eq!(plan.report().updated, 1);
        assert_eq!(plan.report().inserted, 1);
    }

    #[test]
    fn test_replace_transfer_reports_update_only() {
        // One overlapping row owned elsewhere and nothing else to do:
        // replace reports exactly one update.
        let existing = vec![row(9, 1, 100, ControlArea::Logistics, 7)];
        let plan = plan_sync(
            5,
            &[1],
            &[100],
            &[ControlArea::Logistics],
            &existing,
            SyncMode::Replace,
        )
        .unwrap();

        let report = plan.report();
        assert_eq!(report.updated, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.deleted, 0);
    }

    #[test]
    fn test_rows_outside_target_are_deleted() {
        let existing = vec![
            row(9, 1, 100, ControlArea::Logistics, 5),
            row(10, 2, 100, ControlArea::Logistics, 5),
        ];
        let plan = plan_sync(
            5,
            &[1],
            &[100],
            &[ControlArea::Logistics],
            &existing,
            SyncMode::Strict,
        )
        .unwrap();

        assert!(plan.insert.is_empty());
        assert_eq!(plan.delete, vec![10]);
    }

    #[test]
    fn test_empty_sources_clear_department_rows() {
        let existing = vec![row(9, 1, 100, ControlArea::Logistics, 5)];
        let plan = plan_sync(5, &[], &[100], &[ControlArea::Logistics], &existing, SyncMode::Strict)
            .unwrap();

        assert!(plan.insert.is_empty());
        assert!(plan.transfer.is_empty());
        assert_eq!(plan.delete, vec![9]);
    }

    #[test]
    fn test_sync_is_idempotent() {
        // First sync from empty.
        let plan = plan_sync(
            5,
            &[1],
            &[100, 200],
            &[ControlArea::Needed],
            &[],
            SyncMode::Strict,
        )
        .unwrap();
        assert_eq!(plan.insert.len(), 2);

        // Simulate the applied state, then sync again.
        let existing: Vec<ExistingAssignment> = plan
            .insert
            .iter()
            .enumerate()
            .map(|(i, &(s, a, c))| row(i64::try_from(i).unwrap() + 1, s, a, c, 5))
            .collect();
        let second = plan_sync(
            5,
            &[1],
            &[100, 200],
            &[ControlArea::Needed],
            &existing,
            SyncMode::Strict,
        )
        .unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn test_other_departments_rows_outside_target_untouched() {
        let existing = vec![row(9, 3, 300, ControlArea::Cost, 7)];
        let plan = plan_sync(
            5,
            &[1],
            &[100],
            &[ControlArea::Logistics],
            &existing,
            SyncMode::Replace,
        )
        .unwrap();

        assert!(plan.transfer.is_empty());
        assert!(plan.delete.is_empty());
    }
}
