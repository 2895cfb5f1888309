//! Property-based tests for the assignment sync planner.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;

use crate::assignment::sync::{ExistingAssignment, SyncMode, plan_sync};
use crate::assignment::{AssignmentError, ControlArea};

const DEPT: i64 = 5;

fn arb_area() -> impl Strategy<Value = ControlArea> {
    prop_oneof![
        Just(ControlArea::Logistics),
        Just(ControlArea::Needed),
        Just(ControlArea::Cost),
    ]
}

fn arb_existing() -> impl Strategy<Value = Vec<ExistingAssignment>> {
    prop::collection::vec((1i64..4, 100i64..104, arb_area(), 1i64..8), 0..12).prop_map(|rows| {
        let mut seen = BTreeSet::new();
        rows.into_iter()
            .enumerate()
            .filter(|(_, (s, a, c, _))| seen.insert((*s, *a, *c)))
            .map(|(i, (school_id, account_id, control_area, department_id))| {
                ExistingAssignment {
                    id: i64::try_from(i).unwrap() + 1,
                    school_id,
                    account_id,
                    control_area,
                    department_id,
                }
            })
            .collect()
    })
}

fn arb_sources() -> impl Strategy<Value = (Vec<i64>, Vec<i64>, Vec<ControlArea>)> {
    (
        prop::collection::btree_set(1i64..4, 0..3),
        prop::collection::btree_set(100i64..104, 0..3),
        prop::collection::btree_set(arb_area(), 0..3),
    )
        .prop_map(|(s, a, c)| {
            (
                s.into_iter().collect(),
                a.into_iter().collect(),
                c.into_iter().collect(),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Strict mode either fails or transfers nothing.
    #[test]
    fn prop_strict_never_transfers(
        existing in arb_existing(),
        (schools, accounts, areas) in arb_sources(),
    ) {
        match plan_sync(DEPT, &schools, &accounts, &areas, &existing, SyncMode::Strict) {
            Ok(plan) => prop_assert!(plan.transfer.is_empty()),
            Err(AssignmentError::Conflicts(conflicts)) => {
                prop_assert!(!conflicts.is_empty());
                for conflict in conflicts {
                    prop_assert_ne!(conflict.owner_department_id, DEPT);
                }
            }
            Err(other) => return Err(TestCaseError::fail(format!("unexpected error: {other}"))),
        }
    }

    /// Replace mode transfers exactly the target rows owned by others, and
    /// deletes exactly the department's rows outside the target.
    #[test]
    fn prop_replace_diff_is_exact(
        existing in arb_existing(),
        (schools, accounts, areas) in arb_sources(),
    ) {
        let plan = plan_sync(DEPT, &schools, &accounts, &areas, &existing, SyncMode::Replace)
            .unwrap();

        let mut target = BTreeSet::new();
        for &s in &schools {
            for &a in &accounts {
                for &c in &areas {
                    target.insert((s, a, c));
                }
            }
        }

        for row in &existing {
            let key = (row.school_id, row.account_id, row.control_area);
            let in_target = target.contains(&key);
            let transferred = plan.transfer.contains(&row.id);
            let deleted = plan.delete.contains(&row.id);

            if in_target && row.department_id != DEPT {
                prop_assert!(transferred && !deleted);
            } else if !in_target && row.department_id == DEPT {
                prop_assert!(deleted && !transferred);
            } else {
                prop_assert!(!transferred && !deleted);
            }
        }

        // Inserts are the target keys nobody stores yet.
        let stored: BTreeSet<_> = existing
            .iter()
            .map(|r| (r.school_id, r.account_id, r.control_area))
            .collect();
        for key in &plan.insert {
            prop_assert!(target.contains(key) && !stored.contains(key));
        }
    }

    /// Applying the replace-mode plan and planning again yields a no-op.
    #[test]
    fn prop_replace_then_sync_is_noop(
        existing in arb_existing(),
        (schools, accounts, areas) in arb_sources(),
    ) {
        let plan = plan_sync(DEPT, &schools, &accounts, &areas, &existing, SyncMode::Replace)
            .unwrap();

        // Apply the plan in memory.
        let mut applied: Vec<ExistingAssignment> = existing
            .iter()
            .filter(|r| !plan.delete.contains(&r.id))
            .cloned()
            .map(|mut r| {
                if plan.transfer.contains(&r.id) {
                    r.department_id = DEPT;
                }
                r
            })
            .collect();
        let mut next_id = applied.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        for &(school_id, account_id, control_area) in &plan.insert {
            applied.push(ExistingAssignment {
                id: next_id,
                school_id,
                account_id,
                control_area,
                department_id: DEPT,
            });
            next_id += 1;
        }

        let second = plan_sync(DEPT, &schools, &accounts, &areas, &applied, SyncMode::Strict)
            .unwrap();
        prop_assert!(second.is_noop());
    }
}
