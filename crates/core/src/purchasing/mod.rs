//! Purchase request lifecycle and aggregation.
//!
//! Direct purchase requests are a sibling state machine to the budget-item
//! workflow: a header moves `Pending → Forwarded → (Revised | RevisedByUp |
//! Approved)` while per-item moderator and coordinator decisions drive the
//! request total and the aggregate decision statuses.
//!
//! # Modules
//!
//! - `types` - Request statuses, decisions, route-log stage labels
//! - `error` - Purchasing-specific error types
//! - `service` - Transitions and total/aggregate recomputation

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::PurchasingError;
pub use service::{ItemDecisions, PurchasingService};
pub use types::{AggregateStatus, DecisionValue, RequestStatus, route_stage};
