//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod assignment;
pub mod budget;
pub mod purchasing;
pub mod revision;
pub mod template;
pub mod workflow;

pub use assignment::AssignmentRepository;
pub use budget::{BudgetError, BudgetRepository, CreateBudgetInput, CreateBudgetItemInput};
pub use purchasing::{
    CreateRequestInput, CreateRequestItemInput, ItemDecisionInput, PurchasingRepository,
    RequestWithItems,
};
pub use revision::{RevisionFilter, RevisionRepository, RevisionRow};
pub use template::{CreateStageInput, CreateTemplateInput, TemplateRepository};
pub use workflow::{
    CostDecisionInput, DecisionBatchResult, FinalDecisionInput, LogisticsDecisionInput,
    NeededDecisionInput, StageItem, WorkflowRepository,
};
