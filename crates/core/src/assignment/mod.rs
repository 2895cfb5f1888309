//! Control-area ownership for departmental review.
//!
//! A `ControlAssignment` names the department that reviews one control area
//! (`logistics`, `needed`, or `cost`) for one (school, account) pair. The
//! planner computes the exact diff a department sync must apply.
//!
//! # Modules
//!
//! - `sync` - sync diff planning (strict / replace modes)

pub mod sync;

#[cfg(test)]
mod sync_props;

pub use sync::{AssignmentKey, ExistingAssignment, SyncMode, SyncPlan, SyncReport};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The three departmental review dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlArea {
    /// Stock check.
    Logistics,
    /// Necessity review.
    Needed,
    /// Cost entry.
    Cost,
}

impl ControlArea {
    /// All areas, in canonical order.
    pub const ALL: [Self; 3] = [Self::Logistics, Self::Needed, Self::Cost];

    /// Returns the string representation of the area.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logistics => "logistics",
            Self::Needed => "needed",
            Self::Cost => "cost",
        }
    }

    /// Parses an area from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "logistics" => Some(Self::Logistics),
            "needed" => Some(Self::Needed),
            "cost" => Some(Self::Cost),
            _ => None,
        }
    }
}

impl fmt::Display for ControlArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-area owners for one (school, account) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AreaOwners {
    /// Department owning the logistics review, if assigned.
    pub logistics: Option<i64>,
    /// Department owning the needed review, if assigned.
    pub needed: Option<i64>,
    /// Department owning the cost review, if assigned.
    pub cost: Option<i64>,
}

impl AreaOwners {
    /// Sets the owner for one area.
    pub fn set(&mut self, area: ControlArea, department_id: i64) {
        match area {
            ControlArea::Logistics => self.logistics = Some(department_id),
            ControlArea::Needed => self.needed = Some(department_id),
            ControlArea::Cost => self.cost = Some(department_id),
        }
    }

    /// Returns the owner for one area.
    #[must_use]
    pub const fn get(&self, area: ControlArea) -> Option<i64> {
        match area {
            ControlArea::Logistics => self.logistics,
            ControlArea::Needed => self.needed,
            ControlArea::Cost => self.cost,
        }
    }
}

/// An ownership overlap found in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// School of the conflicting row.
    pub school_id: i64,
    /// Account of the conflicting row.
    pub account_id: i64,
    /// Area of the conflicting row.
    pub control_area: ControlArea,
    /// Department that currently owns the row.
    pub owner_department_id: i64,
}

/// Errors raised by assignment operations.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// Strict-mode sync found rows owned by other departments.
    #[error("{} assignment(s) already owned by another department", .0.len())]
    Conflicts(Vec<Conflict>),

    /// Department not found.
    #[error("Department {0} not found")]
    DepartmentNotFound(i64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AssignmentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Conflicts(_) => 409,
            Self::DepartmentNotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Conflicts(_) => "ASSIGNMENT_CONFLICT",
            Self::DepartmentNotFound(_) => "DEPARTMENT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_round_trip() {
        for area in ControlArea::ALL {
            assert_eq!(ControlArea::parse(area.as_str()), Some(area));
        }
        assert_eq!(ControlArea::parse("janitorial"), None);
    }

    #[test]
    fn test_area_owners() {
        let mut owners = AreaOwners::default();
        owners.set(ControlArea::Needed, 7);
        assert_eq!(owners.get(ControlArea::Needed), Some(7));
        assert_eq!(owners.get(ControlArea::Cost), None);
    }

    #[test]
    fn test_conflict_error_status() {
        let err = AssignmentError::Conflicts(vec![Conflict {
            school_id: 1,
            account_id: 100,
            control_area: ControlArea::Logistics,
            owner_department_id: 9,
        }]);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "ASSIGNMENT_CONFLICT");
    }
}
