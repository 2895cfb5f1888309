//! Per-item review pipeline for Bursar.
//!
//! This module implements the budget-item workflow state machine: each item
//! carries a materialized ordered list of steps, and reviewer decisions move
//! the `is_current` marker forward, applying the stage-specific skip rules.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (StepStatus, StageKind, Decision)
//! - `error` - Workflow-specific error types
//! - `engine` - Step advancement logic

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{AdvancePlan, NextStep, WorkflowEngine};
pub use error::WorkflowError;
pub use types::{Decision, FinalPurchaseStatus, StageKind, StepSnapshot, StepStatus};
