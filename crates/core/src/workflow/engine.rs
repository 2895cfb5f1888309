//! Step advancement logic.
//!
//! `WorkflowEngine::advance` is a pure function over a snapshot of an item's
//! steps: it derives the terminal status of the current step from the
//! decision, applies the stage-specific forward rules, and returns a plan the
//! repository executes inside its transaction.

use rust_decimal::Decimal;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Decision, StageKind, StepSnapshot, StepStatus};

/// The step selected to become current, with the fields the item mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStep {
    /// Step row id.
    pub id: i64,
    /// Stage name.
    pub step_name: String,
    /// Position in the pipeline.
    pub sort_order: i32,
    /// Owning department.
    pub owner_of_step: i64,
}

impl NextStep {
    fn from_snapshot(step: &StepSnapshot) -> Self {
        Self {
            id: step.id,
            step_name: step.step_name.clone(),
            sort_order: step.sort_order,
            owner_of_step: step.owner_of_step,
        }
    }
}

/// The mutations a decision produces, to be applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancePlan {
    /// The step that was decided (previously current).
    pub decided_step_id: i64,
    /// Terminal status written to the decided step.
    pub decided_status: StepStatus,
    /// Steps marked `skipped` by the forward rules.
    pub skipped_step_ids: Vec<i64>,
    /// The step to mark current, if any.
    pub next_step: Option<NextStep>,
    /// The step after the new current one, mirrored into the item's
    /// `next_*` columns.
    pub upcoming_step: Option<NextStep>,
    /// True when no current step remains.
    pub workflow_done: bool,
}

/// Stateless engine for budget-item step advancement.
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Finds the single current step of an item.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentStep` if none is marked current and
    /// `MultipleCurrentSteps` if the stored invariant is broken.
    pub fn current_step<'a>(
        item_id: i64,
        steps: &'a [StepSnapshot],
    ) -> Result<&'a StepSnapshot, WorkflowError> {
        let mut currents = steps.iter().filter(|s| s.is_current);
        let first = currents.next().ok_or(WorkflowError::NoCurrentStep(item_id))?;
        let extra = currents.count();
        if extra > 0 {
            return Err(WorkflowError::MultipleCurrentSteps {
                item_id,
                count: extra + 1,
            });
        }
        Ok(first)
    }

    /// Requires the current step to be owned by the caller's department.
    ///
    /// # Errors
    ///
    /// Returns `StepNotOwned` on a mismatch.
    pub fn require_owner(
        item_id: i64,
        step: &StepSnapshot,
        caller_department: i64,
    ) -> Result<(), WorkflowError> {
        if step.owner_of_step == caller_department {
            Ok(())
        } else {
            Err(WorkflowError::StepNotOwned {
                item_id,
                step_id: step.id,
                owner: step.owner_of_step,
                caller: caller_department,
            })
        }
    }

    /// Applies a decision to the item's current step and selects the next one.
    ///
    /// Steps may be passed in any order; the plan honors `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item has no single current step, or the
    /// decision does not match the current stage.
    pub fn advance(
        item_id: i64,
        steps: &[StepSnapshot],
        decision: &Decision,
    ) -> Result<AdvancePlan, WorkflowError> {
        let mut ordered: Vec<&StepSnapshot> = steps.iter().collect();
        ordered.sort_by_key(|s| s.sort_order);

        let current = Self::current_step(item_id, steps)?;
        let decided_status = Self::terminal_status(item_id, current, decision)?;

        // Steps already skipped or decided stay where they are; only pending
        // ones are candidates for selection or skipping.
        let remaining: Vec<&StepSnapshot> = ordered
            .iter()
            .filter(|s| s.sort_order > current.sort_order && s.status == StepStatus::Pending)
            .copied()
            .collect();

        let (skipped, survivors): (Vec<&StepSnapshot>, Vec<&StepSnapshot>) = match decided_status {
            // Full stock: the cost stage has nothing to price.
            StepStatus::InStock => remaining
                .iter()
                .copied()
                .partition(|s| StageKind::is_cost_like(&s.step_name)),
            // Not needed: nothing further to review.
            StepStatus::NotNeeded => (remaining.clone(), Vec::new()),
            _ => (Vec::new(), remaining.clone()),
        };

        let next_step = survivors.first().map(|s| NextStep::from_snapshot(s));
        let upcoming_step = survivors.get(1).map(|s| NextStep::from_snapshot(s));
        let workflow_done = next_step.is_none();

        Ok(AdvancePlan {
            decided_step_id: current.id,
            decided_status,
            skipped_step_ids: skipped.iter().map(|s| s.id).collect(),
            next_step,
            upcoming_step,
            workflow_done,
        })
    }

    /// Derives the terminal status the decision writes to the current step.
    fn terminal_status(
        item_id: i64,
        current: &StepSnapshot,
        decision: &Decision,
    ) -> Result<StepStatus, WorkflowError> {
        let kind = StageKind::classify(&current.step_name);
        if kind != decision.expected_stage() {
            return Err(WorkflowError::StageMismatch {
                item_id,
                stage: current.step_name.clone(),
                expected: decision.expected_stage(),
            });
        }

        Ok(match decision {
            Decision::Logistics {
                provided_qty,
                requested_qty,
            } => {
                if provided_qty >= requested_qty {
                    StepStatus::InStock
                } else if *provided_qty > Decimal::ZERO {
                    StepStatus::InPartial
                } else {
                    StepStatus::OutOfStock
                }
            }
            Decision::Needed { needed: true } => StepStatus::Needed,
            Decision::Needed { needed: false } => StepStatus::NotNeeded,
            Decision::Cost | Decision::Final { .. } => StepStatus::Confirmed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::FinalPurchaseStatus;
    use rust_decimal_macros::dec;

    fn step(id: i64, name: &str, sort_order: i32, owner: i64, is_current: bool) -> StepSnapshot {
        StepSnapshot {
            id,
            step_name: name.to_string(),
            sort_order,
            owner_of_step: owner,
            status: StepStatus::Pending,
            is_current,
        }
    }

    /// logistics(1) needed(2) cost(3) coordinator(4), current on logistics.
    fn standard_pipeline() -> Vec<StepSnapshot> {
        vec![
            step(1, "logistics", 1, 10, true),
            step(2, "needed", 2, 20, false),
            step(3, "cost", 3, 30, false),
            step(4, "coordinator", 4, 40, false),
        ]
    }

    #[test]
    fn test_full_stock_skips_cost_step() {
        let steps = standard_pipeline();
        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(10),
                requested_qty: dec!(10),
            },
        )
        .unwrap();

        assert_eq!(plan.decided_step_id, 1);
        assert_eq!(plan.decided_status, StepStatus::InStock);
        assert_eq!(plan.skipped_step_ids, vec![3]);
        assert_eq!(plan.next_step.as_ref().unwrap().id, 2);
        assert_eq!(plan.upcoming_step.as_ref().unwrap().id, 4);
        assert!(!plan.workflow_done);
    }

    #[test]
    fn test_partial_stock_advances_without_skipping() {
        let steps = standard_pipeline();
        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(4),
                requested_qty: dec!(10),
            },
        )
        .unwrap();

        assert_eq!(plan.decided_status, StepStatus::InPartial);
        assert!(plan.skipped_step_ids.is_empty());
        assert_eq!(plan.next_step.as_ref().unwrap().id, 2);
        assert_eq!(plan.upcoming_step.as_ref().unwrap().id, 3);
    }

    #[test]
    fn test_zero_stock_is_out_of_stock() {
        let steps = standard_pipeline();
        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(0),
                requested_qty: dec!(5),
            },
        )
        .unwrap();

        assert_eq!(plan.decided_status, StepStatus::OutOfStock);
        assert_eq!(plan.next_step.as_ref().unwrap().id, 2);
    }

    #[test]
    fn test_not_needed_skips_everything_and_finishes() {
        let mut steps = standard_pipeline();
        steps[0].is_current = false;
        steps[0].status = StepStatus::OutOfStock;
        steps[1].is_current = true;

        let plan =
            WorkflowEngine::advance(7, &steps, &Decision::Needed { needed: false }).unwrap();

        assert_eq!(plan.decided_status, StepStatus::NotNeeded);
        assert_eq!(plan.skipped_step_ids, vec![3, 4]);
        assert!(plan.next_step.is_none());
        assert!(plan.workflow_done);
    }

    #[test]
    fn test_needed_advances_to_cost() {
        let mut steps = standard_pipeline();
        steps[0].is_current = false;
        steps[0].status = StepStatus::InPartial;
        steps[1].is_current = true;

        let plan = WorkflowEngine::advance(7, &steps, &Decision::Needed { needed: true }).unwrap();

        assert_eq!(plan.decided_status, StepStatus::Needed);
        assert!(plan.skipped_step_ids.is_empty());
        assert_eq!(plan.next_step.as_ref().unwrap().id, 3);
        assert_eq!(plan.upcoming_step.as_ref().unwrap().id, 4);
    }

    #[test]
    fn test_final_decision_on_last_step_finishes() {
        let mut steps = standard_pipeline();
        steps[0].is_current = false;
        steps[3].is_current = true;

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Final {
                status: FinalPurchaseStatus::Approved,
            },
        )
        .unwrap();

        assert_eq!(plan.decided_status, StepStatus::Confirmed);
        assert!(plan.next_step.is_none());
        assert!(plan.workflow_done);
    }

    #[test]
    fn test_in_stock_skips_all_cost_like_steps() {
        let steps = vec![
            step(1, "logistics", 1, 10, true),
            step(2, "cost", 2, 30, false),
            step(3, "Cost Review", 3, 30, false),
            step(4, "coordinator", 4, 40, false),
        ];

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(3),
                requested_qty: dec!(3),
            },
        )
        .unwrap();

        assert_eq!(plan.skipped_step_ids, vec![2, 3]);
        assert_eq!(plan.next_step.as_ref().unwrap().id, 4);
    }

    #[test]
    fn test_in_stock_with_only_cost_steps_remaining_finishes() {
        let steps = vec![
            step(1, "logistics", 1, 10, true),
            step(2, "cost", 2, 30, false),
        ];

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(1),
                requested_qty: dec!(1),
            },
        )
        .unwrap();

        assert_eq!(plan.skipped_step_ids, vec![2]);
        assert!(plan.next_step.is_none());
        assert!(plan.workflow_done);
    }

    #[test]
    fn test_needed_after_skipped_cost_advances_to_coordinator() {
        // Full stock already skipped the cost step; the needed decision must
        // not re-activate it.
        let mut steps = standard_pipeline();
        steps[0].is_current = false;
        steps[0].status = StepStatus::InStock;
        steps[1].is_current = true;
        steps[2].status = StepStatus::Skipped;

        let plan = WorkflowEngine::advance(7, &steps, &Decision::Needed { needed: true }).unwrap();

        assert!(plan.skipped_step_ids.is_empty());
        assert_eq!(plan.next_step.as_ref().unwrap().id, 4);
        assert!(plan.upcoming_step.is_none());
        assert!(!plan.workflow_done);
    }

    #[test]
    fn test_no_current_step_is_rejected() {
        let mut steps = standard_pipeline();
        steps[0].is_current = false;

        let result = WorkflowEngine::advance(7, &steps, &Decision::Cost);
        assert!(matches!(result, Err(WorkflowError::NoCurrentStep(7))));
    }

    #[test]
    fn test_two_current_steps_is_invariant_violation() {
        let mut steps = standard_pipeline();
        steps[2].is_current = true;

        let result = WorkflowEngine::advance(7, &steps, &Decision::Cost);
        assert!(matches!(
            result,
            Err(WorkflowError::MultipleCurrentSteps { item_id: 7, count: 2 })
        ));
    }

    #[test]
    fn test_stage_mismatch_is_rejected() {
        let steps = standard_pipeline();
        let result = WorkflowEngine::advance(7, &steps, &Decision::Cost);
        assert!(matches!(
            result,
            Err(WorkflowError::StageMismatch { item_id: 7, .. })
        ));
    }

    #[test]
    fn test_ownership_check() {
        let steps = standard_pipeline();
        assert!(WorkflowEngine::require_owner(7, &steps[0], 10).is_ok());
        assert!(matches!(
            WorkflowEngine::require_owner(7, &steps[0], 99),
            Err(WorkflowError::StepNotOwned {
                item_id: 7,
                step_id: 1,
                owner: 10,
                caller: 99
            })
        ));
    }

    /// Applies a plan to the snapshot the way the repository writes it.
    fn apply(steps: &mut [StepSnapshot], plan: &AdvancePlan) {
        for step in steps.iter_mut() {
            if step.id == plan.decided_step_id {
                step.status = plan.decided_status;
                step.is_current = false;
            } else if plan.skipped_step_ids.contains(&step.id) {
                step.status = StepStatus::Skipped;
                step.is_current = false;
            }
            if plan.next_step.as_ref().is_some_and(|n| n.id == step.id) {
                step.is_current = true;
            }
        }
    }

    #[test]
    fn test_full_stock_chain_ends_at_coordinator() {
        // Ten of ten in stock: cost is skipped, needed and coordinator decide.
        let mut steps = standard_pipeline();

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(10),
                requested_qty: dec!(10),
            },
        )
        .unwrap();
        apply(&mut steps, &plan);
        assert_eq!(steps[2].status, StepStatus::Skipped);

        let plan = WorkflowEngine::advance(7, &steps, &Decision::Needed { needed: true }).unwrap();
        apply(&mut steps, &plan);
        assert_eq!(plan.next_step.as_ref().unwrap().step_name, "coordinator");

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Final {
                status: FinalPurchaseStatus::Approved,
            },
        )
        .unwrap();
        apply(&mut steps, &plan);
        assert!(plan.workflow_done);
        assert!(steps.iter().all(|s| !s.is_current));
    }

    #[test]
    fn test_partial_stock_chain_walks_every_stage() {
        // Four of ten in stock: every stage decides in order.
        let mut steps = standard_pipeline();

        for (decision, expected_next) in [
            (
                Decision::Logistics {
                    provided_qty: dec!(4),
                    requested_qty: dec!(10),
                },
                Some("needed"),
            ),
            (Decision::Needed { needed: true }, Some("cost")),
            (Decision::Cost, Some("coordinator")),
            (
                Decision::Final {
                    status: FinalPurchaseStatus::Adjusted,
                },
                None,
            ),
        ] {
            let plan = WorkflowEngine::advance(7, &steps, &decision).unwrap();
            apply(&mut steps, &plan);
            assert_eq!(
                plan.next_step.as_ref().map(|n| n.step_name.as_str()),
                expected_next
            );
        }

        assert_eq!(steps[0].status, StepStatus::InPartial);
        assert_eq!(steps[1].status, StepStatus::Needed);
        assert_eq!(steps[2].status, StepStatus::Confirmed);
        assert_eq!(steps[3].status, StepStatus::Confirmed);
    }

    #[test]
    fn test_unsorted_input_is_handled() {
        let mut steps = standard_pipeline();
        steps.reverse();

        let plan = WorkflowEngine::advance(
            7,
            &steps,
            &Decision::Logistics {
                provided_qty: dec!(0),
                requested_qty: dec!(5),
            },
        )
        .unwrap();
        assert_eq!(plan.next_step.as_ref().unwrap().id, 2);
    }
}
