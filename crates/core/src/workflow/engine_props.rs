//! Property-based tests for the step advancement engine.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::workflow::engine::WorkflowEngine;
use crate::workflow::types::{Decision, FinalPurchaseStatus, StageKind, StepSnapshot, StepStatus};

const STAGE_POOL: &[&str] = &[
    "logistics",
    "needed",
    "cost",
    "coordinator",
    "Cost Review",
    "safety check",
];

fn arb_pipeline() -> impl Strategy<Value = (Vec<StepSnapshot>, usize)> {
    // 1..=6 stages drawn from the pool, one of them current.
    (prop::collection::vec(0..STAGE_POOL.len(), 1..=6)).prop_flat_map(|stage_idxs| {
        let len = stage_idxs.len();
        (Just(stage_idxs), 0..len)
    })
    .prop_map(|(stage_idxs, current_idx)| {
        let steps = stage_idxs
            .iter()
            .enumerate()
            .map(|(i, &stage)| StepSnapshot {
                id: i64::try_from(i).unwrap() + 1,
                step_name: STAGE_POOL[stage].to_string(),
                sort_order: i32::try_from(i).unwrap() + 1,
                owner_of_step: 100 + i64::try_from(stage).unwrap(),
                status: if i < current_idx {
                    StepStatus::Confirmed
                } else {
                    StepStatus::Pending
                },
                is_current: i == current_idx,
            })
            .collect();
        (steps, current_idx)
    })
}

/// A decision matching the stage kind of the given step, or None for stages
/// that take no decision (custom stages).
fn decision_for(step: &StepSnapshot, provided: Decimal, needed: bool) -> Option<Decision> {
    match StageKind::classify(&step.step_name) {
        StageKind::Logistics => Some(Decision::Logistics {
            provided_qty: provided,
            requested_qty: Decimal::TEN,
        }),
        StageKind::Needed => Some(Decision::Needed { needed }),
        StageKind::Cost => Some(Decision::Cost),
        StageKind::Coordinator => Some(Decision::Final {
            status: FinalPurchaseStatus::Approved,
        }),
        StageKind::Custom => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The plan always selects exactly one new current step, or finishes.
    #[test]
    fn prop_exactly_one_successor_or_done(
        (steps, current_idx) in arb_pipeline(),
        provided in 0i64..20,
        needed in any::<bool>(),
    ) {
        let current = &steps[current_idx];
        let Some(decision) = decision_for(current, Decimal::from(provided), needed) else {
            return Ok(());
        };

        let plan = WorkflowEngine::advance(1, &steps, &decision).unwrap();
        prop_assert_eq!(plan.workflow_done, plan.next_step.is_none());
        prop_assert_eq!(plan.decided_step_id, current.id);
    }

    /// The new current step always lies strictly after the decided one, and
    /// is never among the skipped steps.
    #[test]
    fn prop_successor_is_forward_and_not_skipped(
        (steps, current_idx) in arb_pipeline(),
        provided in 0i64..20,
        needed in any::<bool>(),
    ) {
        let current = &steps[current_idx];
        let Some(decision) = decision_for(current, Decimal::from(provided), needed) else {
            return Ok(());
        };

        let plan = WorkflowEngine::advance(1, &steps, &decision).unwrap();
        if let Some(next) = &plan.next_step {
            prop_assert!(next.sort_order > current.sort_order);
            prop_assert!(!plan.skipped_step_ids.contains(&next.id));
        }
        for skipped in &plan.skipped_step_ids {
            let step = steps.iter().find(|s| s.id == *skipped).unwrap();
            prop_assert!(step.sort_order > current.sort_order);
        }
    }

    /// Full stock never leaves a cost-like step reachable.
    #[test]
    fn prop_in_stock_skips_every_cost_step(
        (steps, current_idx) in arb_pipeline(),
    ) {
        let current = &steps[current_idx];
        if StageKind::classify(&current.step_name) != StageKind::Logistics {
            return Ok(());
        }

        let decision = Decision::Logistics {
            provided_qty: Decimal::TEN,
            requested_qty: Decimal::TEN,
        };
        let plan = WorkflowEngine::advance(1, &steps, &decision).unwrap();
        prop_assert_eq!(plan.decided_status, StepStatus::InStock);

        for step in steps.iter().filter(|s| s.sort_order > current.sort_order) {
            if StageKind::is_cost_like(&step.step_name) {
                prop_assert!(plan.skipped_step_ids.contains(&step.id));
            } else {
                prop_assert!(!plan.skipped_step_ids.contains(&step.id));
            }
        }
    }

    /// A not-needed decision terminates the item and skips every remaining step.
    #[test]
    fn prop_not_needed_terminates(
        (steps, current_idx) in arb_pipeline(),
    ) {
        let current = &steps[current_idx];
        if StageKind::classify(&current.step_name) != StageKind::Needed {
            return Ok(());
        }

        let plan = WorkflowEngine::advance(1, &steps, &Decision::Needed { needed: false }).unwrap();
        prop_assert!(plan.workflow_done);
        prop_assert!(plan.next_step.is_none());

        let remaining: Vec<i64> = steps
            .iter()
            .filter(|s| s.sort_order > current.sort_order)
            .map(|s| s.id)
            .collect();
        prop_assert_eq!(plan.skipped_step_ids, remaining);
    }

    /// Advancing an already-advanced snapshot again is rejected, never a
    /// second mutation (idempotence of decision batches at the item level).
    #[test]
    fn prop_terminal_item_rejects_further_decisions(
        (steps, current_idx) in arb_pipeline(),
        provided in 0i64..20,
        needed in any::<bool>(),
    ) {
        let current = &steps[current_idx];
        let Some(decision) = decision_for(current, Decimal::from(provided), needed) else {
            return Ok(());
        };

        let plan = WorkflowEngine::advance(1, &steps, &decision).unwrap();
        if !plan.workflow_done {
            return Ok(());
        }

        // Apply the plan: no step remains current.
        let mut after = steps.clone();
        for step in &mut after {
            step.is_current = false;
        }
        let result = WorkflowEngine::advance(1, &after, &decision);
        prop_assert!(result.is_err());
    }
}
