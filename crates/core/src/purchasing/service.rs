//! Purchase request transitions and aggregate recomputation.

use rust_decimal::Decimal;

use crate::purchasing::error::PurchasingError;
use crate::purchasing::types::{AggregateStatus, DecisionValue, RequestStatus};

/// The decision columns of one request item, as loaded for recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDecisions {
    /// Item total price.
    pub total_price: Decimal,
    /// Moderator decision; absent counts as needed.
    pub mod_decision: Option<DecisionValue>,
    /// Coordinator decision; absent counts as needed.
    pub coordinator_decision: Option<DecisionValue>,
}

impl ItemDecisions {
    /// An undecided item counts toward the total: absent decisions coalesce
    /// to needed.
    #[must_use]
    pub fn qualifies(&self) -> bool {
        self.mod_decision.unwrap_or(DecisionValue::Needed) != DecisionValue::NotNeeded
            && self.coordinator_decision.unwrap_or(DecisionValue::Needed)
                != DecisionValue::NotNeeded
    }
}

/// Stateless service for purchase request aggregation and transitions.
pub struct PurchasingService;

impl PurchasingService {
    /// Sums `total_price` over qualifying items at full precision.
    ///
    /// The caller rounds to two fractional digits at the storage boundary.
    #[must_use]
    pub fn total_amount(items: &[ItemDecisions]) -> Decimal {
        items
            .iter()
            .filter(|item| item.qualifies())
            .map(|item| item.total_price)
            .sum()
    }

    /// Derives a reviewer column's aggregate status: `Decided` iff every item
    /// carries a decision.
    #[must_use]
    pub fn aggregate_status<'a, I>(decisions: I) -> AggregateStatus
    where
        I: IntoIterator<Item = &'a Option<DecisionValue>>,
    {
        if decisions.into_iter().all(Option::is_some) {
            AggregateStatus::Decided
        } else {
            AggregateStatus::Incomplete
        }
    }

    /// Moderator forwards the request to the coordinator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the request is pending or was sent
    /// back for rework.
    pub fn send(current: RequestStatus) -> Result<RequestStatus, PurchasingError> {
        match current {
            RequestStatus::Pending | RequestStatus::Revised | RequestStatus::RevisedByUp => {
                Ok(RequestStatus::Forwarded)
            }
            _ => Err(PurchasingError::InvalidTransition {
                from: current,
                to: RequestStatus::Forwarded,
            }),
        }
    }

    /// Moderator sends the request back to the author.
    ///
    /// # Errors
    ///
    /// Returns `ReviseCommentRequired` if the comment is empty and
    /// `InvalidTransition` unless the request is pending.
    pub fn revise_by_moderator(
        current: RequestStatus,
        comment: &str,
    ) -> Result<RequestStatus, PurchasingError> {
        if comment.trim().is_empty() {
            return Err(PurchasingError::ReviseCommentRequired);
        }
        match current {
            RequestStatus::Pending => Ok(RequestStatus::Revised),
            _ => Err(PurchasingError::InvalidTransition {
                from: current,
                to: RequestStatus::Revised,
            }),
        }
    }

    /// Coordinator approves a forwarded request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the request is forwarded.
    pub fn approve(current: RequestStatus) -> Result<RequestStatus, PurchasingError> {
        match current {
            RequestStatus::Forwarded => Ok(RequestStatus::Approved),
            _ => Err(PurchasingError::InvalidTransition {
                from: current,
                to: RequestStatus::Approved,
            }),
        }
    }

    /// Coordinator sends a forwarded request back down.
    ///
    /// # Errors
    ///
    /// Returns `ReviseCommentRequired` if the comment is empty and
    /// `InvalidTransition` unless the request is forwarded.
    pub fn revise_by_coordinator(
        current: RequestStatus,
        comment: &str,
    ) -> Result<RequestStatus, PurchasingError> {
        if comment.trim().is_empty() {
            return Err(PurchasingError::ReviseCommentRequired);
        }
        match current {
            RequestStatus::Forwarded => Ok(RequestStatus::RevisedByUp),
            _ => Err(PurchasingError::InvalidTransition {
                from: current,
                to: RequestStatus::RevisedByUp,
            }),
        }
    }

    /// Admin forces approval from any live status.
    ///
    /// # Errors
    ///
    /// Returns `ApprovedImmutable` if the request is already approved.
    pub fn force_approve(
        request_id: i64,
        current: RequestStatus,
    ) -> Result<RequestStatus, PurchasingError> {
        if current == RequestStatus::Approved {
            return Err(PurchasingError::ApprovedImmutable(request_id));
        }
        Ok(RequestStatus::Approved)
    }

    /// Guards every author/moderator/coordinator edit path.
    ///
    /// # Errors
    ///
    /// Returns `ApprovedImmutable` once the request is approved.
    pub fn ensure_editable(
        request_id: i64,
        current: RequestStatus,
    ) -> Result<(), PurchasingError> {
        if current.is_editable() {
            Ok(())
        } else {
            Err(PurchasingError::ApprovedImmutable(request_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(
        total: Decimal,
        mod_decision: Option<DecisionValue>,
        coordinator_decision: Option<DecisionValue>,
    ) -> ItemDecisions {
        ItemDecisions {
            total_price: total,
            mod_decision,
            coordinator_decision,
        }
    }

    #[test]
    fn test_total_counts_undecided_items_as_needed() {
        let items = vec![
            item(dec!(20), None, None),
            item(dec!(15), Some(DecisionValue::Needed), None),
        ];
        assert_eq!(PurchasingService::total_amount(&items), dec!(35));
    }

    #[test]
    fn test_total_excludes_either_not_needed() {
        // Moderator keeps A, drops C; coordinator drops B.
        let items = vec![
            item(
                dec!(20),
                Some(DecisionValue::Needed),
                Some(DecisionValue::Needed),
            ),
            item(
                dec!(15),
                Some(DecisionValue::Needed),
                Some(DecisionValue::NotNeeded),
            ),
            item(dec!(4), Some(DecisionValue::NotNeeded), None),
        ];
        assert_eq!(PurchasingService::total_amount(&items), dec!(20));
    }

    #[test]
    fn test_total_keeps_full_precision() {
        let items = vec![
            item(dec!(0.105), None, None),
            item(dec!(0.105), None, None),
        ];
        assert_eq!(PurchasingService::total_amount(&items), dec!(0.210));
    }

    #[test]
    fn test_aggregate_status() {
        let decided = vec![Some(DecisionValue::Needed), Some(DecisionValue::NotNeeded)];
        assert_eq!(
            PurchasingService::aggregate_status(decided.iter()),
            AggregateStatus::Decided
        );

        let incomplete = vec![Some(DecisionValue::Needed), None];
        assert_eq!(
            PurchasingService::aggregate_status(incomplete.iter()),
            AggregateStatus::Incomplete
        );

        // Vacuously decided.
        let empty: Vec<Option<DecisionValue>> = vec![];
        assert_eq!(
            PurchasingService::aggregate_status(empty.iter()),
            AggregateStatus::Decided
        );
    }

    #[test]
    fn test_send_from_pending_and_reworked() {
        assert_eq!(
            PurchasingService::send(RequestStatus::Pending).unwrap(),
            RequestStatus::Forwarded
        );
        assert_eq!(
            PurchasingService::send(RequestStatus::Revised).unwrap(),
            RequestStatus::Forwarded
        );
        assert_eq!(
            PurchasingService::send(RequestStatus::RevisedByUp).unwrap(),
            RequestStatus::Forwarded
        );
        assert!(PurchasingService::send(RequestStatus::Approved).is_err());
        assert!(PurchasingService::send(RequestStatus::Forwarded).is_err());
    }

    #[test]
    fn test_moderator_revise() {
        assert_eq!(
            PurchasingService::revise_by_moderator(RequestStatus::Pending, "eksik kalem").unwrap(),
            RequestStatus::Revised
        );
        assert!(matches!(
            PurchasingService::revise_by_moderator(RequestStatus::Pending, "  "),
            Err(PurchasingError::ReviseCommentRequired)
        ));
        assert!(
            PurchasingService::revise_by_moderator(RequestStatus::Forwarded, "geri").is_err()
        );
    }

    #[test]
    fn test_coordinator_approve_and_revise() {
        assert_eq!(
            PurchasingService::approve(RequestStatus::Forwarded).unwrap(),
            RequestStatus::Approved
        );
        assert!(PurchasingService::approve(RequestStatus::Pending).is_err());

        assert_eq!(
            PurchasingService::revise_by_coordinator(RequestStatus::Forwarded, "fiyat yüksek")
                .unwrap(),
            RequestStatus::RevisedByUp
        );
        assert!(
            PurchasingService::revise_by_coordinator(RequestStatus::Pending, "erken").is_err()
        );
    }

    #[test]
    fn test_admin_force_approve() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Forwarded,
            RequestStatus::Revised,
            RequestStatus::RevisedByUp,
        ] {
            assert_eq!(
                PurchasingService::force_approve(1, status).unwrap(),
                RequestStatus::Approved
            );
        }
        assert!(matches!(
            PurchasingService::force_approve(1, RequestStatus::Approved),
            Err(PurchasingError::ApprovedImmutable(1))
        ));
    }

    #[test]
    fn test_ensure_editable() {
        assert!(PurchasingService::ensure_editable(1, RequestStatus::Pending).is_ok());
        assert!(matches!(
            PurchasingService::ensure_editable(1, RequestStatus::Approved),
            Err(PurchasingError::ApprovedImmutable(1))
        ));
    }
}
