//! Purchasing error types.

use thiserror::Error;

use crate::purchasing::types::RequestStatus;

/// Errors that can occur during purchase request operations.
#[derive(Debug, Error)]
pub enum PurchasingError {
    /// Request not found, or outside the caller's scope.
    ///
    /// Scope misses map to the same error so listings do not leak which
    /// requests exist.
    #[error("Purchase request {0} not found")]
    RequestNotFound(i64),

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: RequestStatus,
        /// The attempted target status.
        to: RequestStatus,
    },

    /// Attempted to modify an approved request.
    #[error("Request {0} is approved and immutable")]
    ApprovedImmutable(i64),

    /// Revise comment is required but not provided.
    #[error("Revise comment is required")]
    ReviseCommentRequired,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl PurchasingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } | Self::ReviseCommentRequired => 400,

            Self::ApprovedImmutable(_) => 409,

            Self::RequestNotFound(_) => 404,

            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ApprovedImmutable(_) => "APPROVED_IMMUTABLE",
            Self::ReviseCommentRequired => "REVISE_COMMENT_REQUIRED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = PurchasingError::InvalidTransition {
            from: RequestStatus::Approved,
            to: RequestStatus::Forwarded,
        };
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("Approved"));
    }

    #[test]
    fn test_approved_immutable_is_conflict() {
        let err = PurchasingError::ApprovedImmutable(3);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "APPROVED_IMMUTABLE");
    }

    #[test]
    fn test_scope_miss_maps_to_not_found() {
        assert_eq!(PurchasingError::RequestNotFound(1).status_code(), 404);
    }
}
