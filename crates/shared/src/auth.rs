//! Authentication types for the bearer principal.
//!
//! The auth collaborator issues the token; this module only describes the
//! principal the rest of the system consumes read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles recognized across the purchasing and budget workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// School end user who drafts budgets and purchase requests.
    Author,
    /// Intermediate approver for purchase requests.
    Moderator,
    /// Final-approval authority.
    Coordinator,
    /// Departmental reviewer for logistics / needed / cost stages.
    Reviewer,
    /// Accountant archiver for approved requests.
    Muhasebeci,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Moderator => "moderator",
            Self::Coordinator => "coordinator",
            Self::Reviewer => "reviewer",
            Self::Muhasebeci => "muhasebeci",
            Self::Admin => "admin",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "author" => Some(Self::Author),
            "moderator" => Some(Self::Moderator),
            "coordinator" => Some(Self::Coordinator),
            "reviewer" => Some(Self::Reviewer),
            "muhasebeci" => Some(Self::Muhasebeci),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims carried by every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Subject (user ID).
    pub sub: i64,
    /// Display name, used for route-log entries.
    pub name: String,
    /// The principal's role.
    pub role: Role,
    /// Permission set granted by the auth collaborator.
    #[serde(default)]
    pub perms: Vec<String>,
    /// School the principal belongs to.
    pub school_id: i64,
    /// Department the principal belongs to, if any.
    pub department_id: Option<i64>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Principal {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: i64,
        name: &str,
        role: Role,
        school_id: i64,
        department_id: Option<i64>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            name: name.to_string(),
            role,
            perms: Vec::new(),
            school_id,
            department_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.sub
    }

    /// Returns true if the principal carries the given permission.
    #[must_use]
    pub fn has_perm(&self, perm: &str) -> bool {
        self.perms.iter().any(|p| p == perm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::Author,
            Role::Moderator,
            Role::Coordinator,
            Role::Reviewer,
            Role::Muhasebeci,
            Role::Admin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("janitor"), None);
    }

    #[test]
    fn test_principal_perms() {
        let mut principal = Principal::new(7, "Ayşe", Role::Reviewer, 1, Some(3), Utc::now());
        assert!(!principal.has_perm("budget.review"));
        principal.perms.push("budget.review".to_string());
        assert!(principal.has_perm("budget.review"));
    }
}
