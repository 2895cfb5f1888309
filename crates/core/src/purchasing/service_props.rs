//! Property-based tests for purchase request aggregation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::purchasing::service::{ItemDecisions, PurchasingService};
use crate::purchasing::types::{AggregateStatus, DecisionValue};

fn arb_decision() -> impl Strategy<Value = Option<DecisionValue>> {
    prop_oneof![
        Just(None),
        Just(Some(DecisionValue::Needed)),
        Just(Some(DecisionValue::NotNeeded)),
    ]
}

fn arb_items() -> impl Strategy<Value = Vec<ItemDecisions>> {
    prop::collection::vec(
        (1i64..100_000, arb_decision(), arb_decision()).prop_map(
            |(cents, mod_decision, coordinator_decision)| ItemDecisions {
                total_price: Decimal::new(cents, 2),
                mod_decision,
                coordinator_decision,
            },
        ),
        0..20,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The total equals the sum over items where neither decision coalesces
    /// to not-needed.
    #[test]
    fn prop_total_matches_coalesce_rule(items in arb_items()) {
        let total = PurchasingService::total_amount(&items);

        let expected: Decimal = items
            .iter()
            .filter(|i| {
                i.mod_decision != Some(DecisionValue::NotNeeded)
                    && i.coordinator_decision != Some(DecisionValue::NotNeeded)
            })
            .map(|i| i.total_price)
            .sum();
        prop_assert_eq!(total, expected);
    }

    /// Marking any item not-needed never increases the total.
    #[test]
    fn prop_not_needed_is_monotone(items in arb_items(), idx in 0usize..20) {
        if items.is_empty() {
            return Ok(());
        }
        let idx = idx % items.len();
        let before = PurchasingService::total_amount(&items);

        let mut dropped = items.clone();
        dropped[idx].mod_decision = Some(DecisionValue::NotNeeded);
        let after = PurchasingService::total_amount(&dropped);

        prop_assert!(after <= before);
    }

    /// Recomputing twice on unchanged items yields the same total.
    #[test]
    fn prop_total_is_idempotent(items in arb_items()) {
        let first = PurchasingService::total_amount(&items);
        let second = PurchasingService::total_amount(&items);
        prop_assert_eq!(first, second);
    }

    /// The aggregate is decided exactly when no decision is absent.
    #[test]
    fn prop_aggregate_decided_iff_all_present(items in arb_items()) {
        let decisions: Vec<Option<DecisionValue>> =
            items.iter().map(|i| i.mod_decision).collect();
        let status = PurchasingService::aggregate_status(decisions.iter());

        if decisions.iter().all(Option::is_some) {
            prop_assert_eq!(status, AggregateStatus::Decided);
        } else {
            prop_assert_eq!(status, AggregateStatus::Incomplete);
        }
    }
}
