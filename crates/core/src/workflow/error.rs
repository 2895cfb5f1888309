//! Workflow error types for the budget-item review pipeline.

use thiserror::Error;

use crate::workflow::types::StageKind;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Budget item not found.
    #[error("Budget item {0} not found")]
    ItemNotFound(i64),

    /// The item has no current step to decide.
    #[error("Budget item {0} has no current step")]
    NoCurrentStep(i64),

    /// More than one step is marked current for the item.
    #[error("Budget item {item_id} has {count} current steps")]
    MultipleCurrentSteps {
        /// The corrupted item.
        item_id: i64,
        /// Number of current steps found.
        count: usize,
    },

    /// The current step is owned by another department.
    #[error(
        "Step {step_id} of item {item_id} is owned by department {owner}, not {caller}"
    )]
    StepNotOwned {
        /// The targeted item.
        item_id: i64,
        /// The current step.
        step_id: i64,
        /// Department that owns the step.
        owner: i64,
        /// Department that attempted the decision.
        caller: i64,
    },

    /// The decision does not match the current stage.
    #[error("Item {item_id} is at stage '{stage}', decision targets {expected:?}")]
    StageMismatch {
        /// The targeted item.
        item_id: i64,
        /// Name of the current stage.
        stage: String,
        /// Stage kind the decision is valid for.
        expected: StageKind,
    },

    /// Revise back requested from a stage that does not allow it.
    #[error("Stage '{stage}' does not allow revising item {item_id} back")]
    ReviseNotAllowed {
        /// The targeted item.
        item_id: i64,
        /// Name of the current stage.
        stage: String,
    },

    /// Revise reason is required but not provided.
    #[error("Revise reason is required")]
    ReviseReasonRequired,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::StageMismatch { .. }
            | Self::ReviseNotAllowed { .. }
            | Self::ReviseReasonRequired
            | Self::NoCurrentStep(_) => 400,

            Self::StepNotOwned { .. } => 403,

            Self::ItemNotFound(_) => 404,

            Self::MultipleCurrentSteps { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::NoCurrentStep(_) => "NO_CURRENT_STEP",
            Self::MultipleCurrentSteps { .. } => "MULTIPLE_CURRENT_STEPS",
            Self::StepNotOwned { .. } => "STEP_NOT_OWNED",
            Self::StageMismatch { .. } => "STAGE_MISMATCH",
            Self::ReviseNotAllowed { .. } => "REVISE_NOT_ALLOWED",
            Self::ReviseReasonRequired => "REVISE_REASON_REQUIRED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_error_is_forbidden() {
        let err = WorkflowError::StepNotOwned {
            item_id: 1,
            step_id: 2,
            owner: 3,
            caller: 4,
        };
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "STEP_NOT_OWNED");
    }

    #[test]
    fn test_invariant_error_is_internal() {
        let err = WorkflowError::MultipleCurrentSteps {
            item_id: 1,
            count: 2,
        };
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "MULTIPLE_CURRENT_STEPS");
    }

    #[test]
    fn test_not_found_errors() {
        assert_eq!(WorkflowError::ItemNotFound(9).status_code(), 404);
        assert_eq!(WorkflowError::ItemNotFound(9).error_code(), "ITEM_NOT_FOUND");
    }
}
