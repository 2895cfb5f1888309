//! `SeaORM` entity definitions.

pub mod budget_items;
pub mod budgets;
pub mod control_assignments;
pub mod department_accounts;
pub mod department_areas;
pub mod department_schools;
pub mod departments;
pub mod food_eaters;
pub mod purchasing_request_items;
pub mod purchasing_requests;
pub mod request_routes;
pub mod revision_answers;
pub mod schools;
pub mod steps;
pub mod sub_accounts;
pub mod template_stages;
pub mod users;
pub mod workflow_bindings;
pub mod workflow_templates;
