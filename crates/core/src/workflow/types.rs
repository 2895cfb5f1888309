//! Workflow domain types for the budget-item review pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a materialized step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not been decided yet.
    Pending,
    /// Step was confirmed (cost recorded or final decision made).
    Confirmed,
    /// Needed review decided the item is needed.
    Needed,
    /// Needed review decided the item is not needed.
    NotNeeded,
    /// Logistics found the full requested quantity in stock.
    InStock,
    /// Logistics found part of the requested quantity in stock.
    InPartial,
    /// Logistics found nothing in stock.
    OutOfStock,
    /// Step was skipped by a forward rule.
    Skipped,
}

impl StepStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Needed => "needed",
            Self::NotNeeded => "not_needed",
            Self::InStock => "in_stock",
            Self::InPartial => "in_partial",
            Self::OutOfStock => "out_of_stock",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "needed" => Some(Self::Needed),
            "not_needed" => Some(Self::NotNeeded),
            "in_stock" => Some(Self::InStock),
            "in_partial" => Some(Self::InPartial),
            "out_of_stock" => Some(Self::OutOfStock),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns true once a step can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a stage by its name.
///
/// `logistics`, `needed`, `cost`, and `coordinator` are the built-in stages;
/// anything else is a custom checkpoint that only advances, never branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Stock check stage.
    Logistics,
    /// Necessity review stage.
    Needed,
    /// Cost entry stage.
    Cost,
    /// Final coordinator decision stage.
    Coordinator,
    /// Free-form custom stage.
    Custom,
}

impl StageKind {
    /// Classifies a stage name.
    #[must_use]
    pub fn classify(stage_name: &str) -> Self {
        match stage_name.trim().to_lowercase().as_str() {
            "logistics" => Self::Logistics,
            "needed" => Self::Needed,
            "cost" => Self::Cost,
            "coordinator" => Self::Coordinator,
            _ => Self::Custom,
        }
    }

    /// The in-stock skip rule matches any step whose name contains `cost`,
    /// case-insensitively, so custom stages like "Cost Review" are skipped too.
    #[must_use]
    pub fn is_cost_like(stage_name: &str) -> bool {
        stage_name.to_lowercase().contains("cost")
    }
}

/// Final decision recorded by the coordinator on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalPurchaseStatus {
    /// Purchase approved as requested.
    Approved,
    /// Purchase approved with adjusted cost or quantity.
    Adjusted,
    /// Purchase rejected.
    Rejected,
}

impl FinalPurchaseStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Adjusted => "adjusted",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a final purchase status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "adjusted" => Some(Self::Adjusted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for FinalPurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one materialized step, as loaded for advancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSnapshot {
    /// Step row id.
    pub id: i64,
    /// Stage name copied from the template.
    pub step_name: String,
    /// Position in the pipeline, strictly increasing per item.
    pub sort_order: i32,
    /// Department that owns the decision at this step.
    pub owner_of_step: i64,
    /// Current status.
    pub status: StepStatus,
    /// Whether this step is the one waiting for a decision.
    pub is_current: bool,
}

/// A reviewer decision applied to an item's current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Logistics stock check.
    Logistics {
        /// Quantity found in storage.
        provided_qty: Decimal,
        /// Quantity the item requested.
        requested_qty: Decimal,
    },
    /// Necessity review. `needed_status` 1 maps to true, 0 to false.
    Needed {
        /// Whether the item is needed.
        needed: bool,
    },
    /// Cost entry; the purchase cost was recorded.
    Cost,
    /// Coordinator final decision.
    Final {
        /// The decision recorded.
        status: FinalPurchaseStatus,
    },
}

impl Decision {
    /// The stage kind this decision is valid for.
    #[must_use]
    pub const fn expected_stage(&self) -> StageKind {
        match self {
            Self::Logistics { .. } => StageKind::Logistics,
            Self::Needed { .. } => StageKind::Needed,
            Self::Cost => StageKind::Cost,
            Self::Final { .. } => StageKind::Coordinator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            StepStatus::Pending,
            StepStatus::Confirmed,
            StepStatus::Needed,
            StepStatus::NotNeeded,
            StepStatus::InStock,
            StepStatus::InPartial,
            StepStatus::OutOfStock,
            StepStatus::Skipped,
        ] {
            assert_eq!(StepStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StepStatus::parse("unknown"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!StepStatus::Pending.is_terminal());
        assert!(StepStatus::Confirmed.is_terminal());
        assert!(StepStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_stage_classification() {
        assert_eq!(StageKind::classify("logistics"), StageKind::Logistics);
        assert_eq!(StageKind::classify("Needed"), StageKind::Needed);
        assert_eq!(StageKind::classify(" cost "), StageKind::Cost);
        assert_eq!(StageKind::classify("coordinator"), StageKind::Coordinator);
        assert_eq!(StageKind::classify("safety check"), StageKind::Custom);
    }

    #[test]
    fn test_cost_like_matching() {
        assert!(StageKind::is_cost_like("cost"));
        assert!(StageKind::is_cost_like("Cost Review"));
        assert!(StageKind::is_cost_like("unit COST check"));
        assert!(!StageKind::is_cost_like("coordinator"));
    }

    #[test]
    fn test_final_status_round_trip() {
        for status in [
            FinalPurchaseStatus::Approved,
            FinalPurchaseStatus::Adjusted,
            FinalPurchaseStatus::Rejected,
        ] {
            assert_eq!(FinalPurchaseStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FinalPurchaseStatus::parse("maybe"), None);
    }
}
