//! Workflow template resolution and step materialization.
//!
//! Templates bind an ordered list of stages to a (school, account) pair.
//! When a budget is submitted, each item copies the resolved template's
//! stages into its own step ledger; the copy is frozen from then on.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::workflow::types::StepStatus;

/// A stage row of a workflow template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Stage name (`logistics`, `needed`, `cost`, `coordinator`, or custom).
    pub stage_name: String,
    /// Position within the template, unique and ≥ 1.
    pub sort_order: i32,
    /// Department that will own the materialized step.
    pub owner_department_id: i64,
    /// Whether reviewers at this stage may send items back for revision.
    pub allow_revise: bool,
}

/// A (school, account) → template binding candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Bound template.
    pub template_id: i64,
    /// Lower wins.
    pub priority: i32,
    /// Tie-breaker: most recent wins.
    pub created_at: DateTime<Utc>,
}

/// A step prototype produced by materialization, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProto {
    /// Stage name copied from the template.
    pub step_name: String,
    /// Position copied from the template.
    pub sort_order: i32,
    /// Owning department at materialization time.
    pub owner_of_step: i64,
    /// Initial status.
    pub status: StepStatus,
    /// Set only on the lowest sort order.
    pub is_current: bool,
}

/// Errors raised while resolving or materializing templates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template has no stages.
    #[error("Template {0} has no stages")]
    EmptyTemplate(i64),

    /// Two stages share a sort order.
    #[error("Template {template_id} has duplicate sort order {sort_order}")]
    DuplicateSortOrder {
        /// The offending template.
        template_id: i64,
        /// The repeated position.
        sort_order: i32,
    },

    /// A stage has a sort order below 1.
    #[error("Template {template_id} has sort order {sort_order} below 1")]
    SortOrderBelowOne {
        /// The offending template.
        template_id: i64,
        /// The invalid position.
        sort_order: i32,
    },
}

/// Stateless template operations.
pub struct TemplateStore;

impl TemplateStore {
    /// Picks the binding that applies: lowest `priority`, ties broken by the
    /// most recent `created_at`.
    #[must_use]
    pub fn resolve_binding(bindings: &[Binding]) -> Option<i64> {
        bindings
            .iter()
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.created_at.cmp(&a.created_at))
            })
            .map(|b| b.template_id)
    }

    /// Copies a template's stages into step prototypes for one item.
    ///
    /// The first step (lowest sort order) is current; everything else is
    /// pending and inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage list is empty or its sort orders are
    /// invalid.
    pub fn materialize(template_id: i64, stages: &[Stage]) -> Result<Vec<StepProto>, TemplateError> {
        if stages.is_empty() {
            return Err(TemplateError::EmptyTemplate(template_id));
        }

        let mut ordered: Vec<&Stage> = stages.iter().collect();
        ordered.sort_by_key(|s| s.sort_order);

        for pair in ordered.windows(2) {
            if pair[0].sort_order == pair[1].sort_order {
                return Err(TemplateError::DuplicateSortOrder {
                    template_id,
                    sort_order: pair[0].sort_order,
                });
            }
        }
        if ordered[0].sort_order < 1 {
            return Err(TemplateError::SortOrderBelowOne {
                template_id,
                sort_order: ordered[0].sort_order,
            });
        }

        Ok(ordered
            .iter()
            .enumerate()
            .map(|(i, stage)| StepProto {
                step_name: stage.stage_name.clone(),
                sort_order: stage.sort_order,
                owner_of_step: stage.owner_department_id,
                status: StepStatus::Pending,
                is_current: i == 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn binding(template_id: i64, priority: i32, ts: i64) -> Binding {
        Binding {
            template_id,
            priority,
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    fn stage(name: &str, sort_order: i32, owner: i64) -> Stage {
        Stage {
            stage_name: name.to_string(),
            sort_order,
            owner_department_id: owner,
            allow_revise: false,
        }
    }

    #[test]
    fn test_resolve_lowest_priority_wins() {
        let bindings = vec![binding(1, 5, 100), binding(2, 1, 50), binding(3, 3, 200)];
        assert_eq!(TemplateStore::resolve_binding(&bindings), Some(2));
    }

    #[test]
    fn test_resolve_tie_broken_by_recency() {
        let bindings = vec![binding(1, 1, 100), binding(2, 1, 300), binding(3, 1, 200)];
        assert_eq!(TemplateStore::resolve_binding(&bindings), Some(2));
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(TemplateStore::resolve_binding(&[]), None);
    }

    #[test]
    fn test_materialize_marks_first_current() {
        let stages = vec![
            stage("cost", 3, 30),
            stage("logistics", 1, 10),
            stage("needed", 2, 20),
        ];

        let steps = TemplateStore::materialize(5, &stages).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].step_name, "logistics");
        assert!(steps[0].is_current);
        assert_eq!(steps[0].status, StepStatus::Pending);
        assert!(!steps[1].is_current);
        assert!(!steps[2].is_current);
        assert_eq!(steps[2].sort_order, 3);
    }

    #[test]
    fn test_materialize_empty_template() {
        assert_eq!(
            TemplateStore::materialize(5, &[]),
            Err(TemplateError::EmptyTemplate(5))
        );
    }

    #[test]
    fn test_materialize_duplicate_sort_order() {
        let stages = vec![stage("logistics", 1, 10), stage("needed", 1, 20)];
        assert_eq!(
            TemplateStore::materialize(5, &stages),
            Err(TemplateError::DuplicateSortOrder {
                template_id: 5,
                sort_order: 1
            })
        );
    }

    #[test]
    fn test_materialize_sort_order_below_one() {
        let stages = vec![stage("logistics", 0, 10)];
        assert_eq!(
            TemplateStore::materialize(5, &stages),
            Err(TemplateError::SortOrderBelowOne {
                template_id: 5,
                sort_order: 0
            })
        );
    }
}
