//! Purchase request domain types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Route-log stage labels, preserved byte-exact.
pub mod route_stage {
    /// Author created the request.
    pub const STARTED: &str = "Başlatan";
    /// Moderator forwarded the request.
    pub const REQUESTED: &str = "Talep edildi";
    /// Coordinator approved the request.
    pub const APPROVED: &str = "Onaylandı";
    /// Moderator or coordinator sent the request back.
    pub const REVISED: &str = "Revize edildi";
    /// Request contents were edited.
    pub const CHANGED: &str = "Değişiklik Yapıldı";
    /// Admin force-approved the request.
    pub const ADMIN_APPROVED: &str = "Admin Approved";
    /// Admin overrode per-item decisions.
    pub const ADMIN_OVERRIDE: &str = "Admin Override";
}

/// Header status of a purchase request.
///
/// `Approved` is terminal: the header and its items become immutable through
/// the author-, moderator-, and coordinator-facing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Created by the author, waiting for the moderator.
    Pending,
    /// Forwarded by the moderator to the coordinator.
    Forwarded,
    /// Sent back by the moderator.
    Revised,
    /// Sent back by the coordinator.
    RevisedByUp,
    /// Approved by the coordinator (or forced by an admin).
    Approved,
}

impl RequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Forwarded => "Forwarded",
            Self::Revised => "Revised",
            Self::RevisedByUp => "RevisedByUp",
            Self::Approved => "Approved",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Forwarded" => Some(Self::Forwarded),
            "Revised" => Some(Self::Revised),
            "RevisedByUp" => Some(Self::RevisedByUp),
            "Approved" => Some(Self::Approved),
            _ => None,
        }
    }

    /// Returns true while the request can still be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !matches!(self, Self::Approved)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-item needed / not-needed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionValue {
    /// The item should be purchased.
    Needed,
    /// The item should not be purchased.
    NotNeeded,
}

impl DecisionValue {
    /// Returns the string representation of the decision.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Needed => "needed",
            Self::NotNeeded => "not-needed",
        }
    }

    /// Parses a decision from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "needed" => Some(Self::Needed),
            "not-needed" => Some(Self::NotNeeded),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate decision status of a reviewer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateStatus {
    /// Every item carries a decision.
    Decided,
    /// At least one item is undecided.
    Incomplete,
    /// The reviewer sent the request back.
    Revised,
}

impl AggregateStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Decided => "Decided",
            Self::Incomplete => "Incomplete",
            Self::Revised => "Revised",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Decided" => Some(Self::Decided),
            "Incomplete" => Some(Self::Incomplete),
            "Revised" => Some(Self::Revised),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Forwarded,
            RequestStatus::Revised,
            RequestStatus::RevisedByUp,
            RequestStatus::Approved,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("pending"), None);
    }

    #[test]
    fn test_only_approved_is_immutable() {
        assert!(RequestStatus::Pending.is_editable());
        assert!(RequestStatus::Forwarded.is_editable());
        assert!(RequestStatus::Revised.is_editable());
        assert!(RequestStatus::RevisedByUp.is_editable());
        assert!(!RequestStatus::Approved.is_editable());
    }

    #[test]
    fn test_decision_round_trip() {
        assert_eq!(DecisionValue::parse("needed"), Some(DecisionValue::Needed));
        assert_eq!(
            DecisionValue::parse("not-needed"),
            Some(DecisionValue::NotNeeded)
        );
        assert_eq!(DecisionValue::parse("not_needed"), None);
    }

    #[test]
    fn test_route_stage_labels_are_byte_exact() {
        assert_eq!(route_stage::STARTED, "Başlatan");
        assert_eq!(route_stage::REQUESTED, "Talep edildi");
        assert_eq!(route_stage::APPROVED, "Onaylandı");
        assert_eq!(route_stage::REVISED, "Revize edildi");
        assert_eq!(route_stage::CHANGED, "Değişiklik Yapıldı");
    }
}
