//! Initial schema migration.
//!
//! Creates the master data, budget workflow, and purchasing tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r#"
-- Master data
CREATE TABLE schools (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL
);

CREATE TABLE departments (
    id BIGSERIAL PRIMARY KEY,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    notify_email VARCHAR(255)
);

CREATE TABLE sub_accounts (
    id BIGSERIAL PRIMARY KEY,
    code VARCHAR(32) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    master_id BIGINT NOT NULL,
    CONSTRAINT chk_sub_account_master_prefix CHECK (code ~ '^[0-9]{3}')
);

CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    display_name VARCHAR(255) NOT NULL,
    role VARCHAR(32) NOT NULL,
    school_id BIGINT REFERENCES schools(id),
    department_id BIGINT REFERENCES departments(id),
    budget_mod BIGINT REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_users_school ON users(school_id);
CREATE INDEX idx_users_budget_mod ON users(budget_mod);

CREATE TABLE food_eaters (
    school_id BIGINT PRIMARY KEY REFERENCES schools(id) ON DELETE CASCADE,
    eating_number INTEGER NOT NULL
);

-- Department source sets feeding assignment sync
CREATE TABLE department_schools (
    department_id BIGINT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    school_id BIGINT NOT NULL REFERENCES schools(id) ON DELETE CASCADE,
    PRIMARY KEY (department_id, school_id)
);

CREATE TABLE department_accounts (
    department_id BIGINT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    account_id BIGINT NOT NULL REFERENCES sub_accounts(id) ON DELETE CASCADE,
    PRIMARY KEY (department_id, account_id)
);

CREATE TABLE department_areas (
    department_id BIGINT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    control_area VARCHAR(16) NOT NULL,
    PRIMARY KEY (department_id, control_area),
    CONSTRAINT chk_control_area CHECK (control_area IN ('logistics', 'needed', 'cost'))
);

-- Control-area ownership
CREATE TABLE control_assignments (
    id BIGSERIAL PRIMARY KEY,
    school_id BIGINT NOT NULL REFERENCES schools(id),
    account_id BIGINT NOT NULL REFERENCES sub_accounts(id),
    control_area VARCHAR(16) NOT NULL,
    department_id BIGINT NOT NULL REFERENCES departments(id),
    CONSTRAINT uq_control_assignment UNIQUE (school_id, account_id, control_area),
    CONSTRAINT chk_assignment_area CHECK (control_area IN ('logistics', 'needed', 'cost'))
);

CREATE INDEX idx_control_assignments_department ON control_assignments(department_id);

-- Workflow templates
CREATE TABLE workflow_templates (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE template_stages (
    id BIGSERIAL PRIMARY KEY,
    template_id BIGINT NOT NULL REFERENCES workflow_templates(id) ON DELETE CASCADE,
    stage_name VARCHAR(64) NOT NULL,
    sort_order INTEGER NOT NULL,
    owner_department_id BIGINT NOT NULL REFERENCES departments(id),
    allow_revise BOOLEAN NOT NULL DEFAULT FALSE,
    CONSTRAINT uq_template_stage_order UNIQUE (template_id, sort_order),
    CONSTRAINT chk_stage_order CHECK (sort_order >= 1)
);

CREATE TABLE workflow_bindings (
    id BIGSERIAL PRIMARY KEY,
    school_id BIGINT NOT NULL REFERENCES schools(id),
    account_id BIGINT NOT NULL REFERENCES sub_accounts(id),
    template_id BIGINT NOT NULL REFERENCES workflow_templates(id) ON DELETE CASCADE,
    priority INTEGER NOT NULL DEFAULT 100,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_workflow_bindings_school_account ON workflow_bindings(school_id, account_id);

-- Budgets and items
CREATE TABLE budgets (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id),
    school_id BIGINT NOT NULL REFERENCES schools(id),
    period VARCHAR(7) NOT NULL,
    title VARCHAR(255) NOT NULL,
    description TEXT,
    request_type VARCHAR(32) NOT NULL DEFAULT 'new',
    budget_status VARCHAR(32) NOT NULL DEFAULT 'draft',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    closed_at TIMESTAMPTZ,
    CONSTRAINT chk_budget_status CHECK (
        budget_status IN ('draft', 'in_review', 'review_been_completed', 'closed')
    )
);

CREATE INDEX idx_budgets_school_period ON budgets(school_id, period);
CREATE INDEX idx_budgets_status ON budgets(budget_status);

CREATE TABLE budget_items (
    id BIGSERIAL PRIMARY KEY,
    budget_id BIGINT NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
    account_id BIGINT NOT NULL REFERENCES sub_accounts(id),
    item_id BIGINT,
    item_name VARCHAR(255) NOT NULL,
    itemdescription TEXT,
    quantity NUMERIC(14, 2) NOT NULL,
    cost NUMERIC(14, 2) NOT NULL,
    unit VARCHAR(32) NOT NULL,
    period_months INTEGER NOT NULL DEFAULT 1,
    notes TEXT,
    storage_status VARCHAR(16),
    storage_provided_qty NUMERIC(14, 2),
    needed_status SMALLINT,
    needed_notes TEXT,
    purchase_cost NUMERIC(14, 2),
    final_purchase_cost NUMERIC(14, 2),
    final_quantity NUMERIC(14, 2),
    final_purchase_status VARCHAR(16),
    workflow_done BOOLEAN NOT NULL DEFAULT FALSE,
    revision_state VARCHAR(16) NOT NULL DEFAULT 'none',
    revise_reason TEXT,
    revised_at TIMESTAMPTZ,
    route_template_id BIGINT REFERENCES workflow_templates(id),
    current_step_id BIGINT,
    current_stage VARCHAR(64),
    current_step_order INTEGER,
    current_owner_department_id BIGINT,
    next_step_id BIGINT,
    next_stage VARCHAR(64),
    next_owner_department_id BIGINT,
    CONSTRAINT chk_needed_status CHECK (needed_status IN (0, 1)),
    CONSTRAINT chk_final_status CHECK (
        final_purchase_status IN ('approved', 'adjusted', 'rejected')
    ),
    CONSTRAINT chk_revision_state CHECK (
        revision_state IN ('none', 'pending', 'answered', 'resolved')
    )
);

CREATE INDEX idx_budget_items_budget ON budget_items(budget_id);
CREATE INDEX idx_budget_items_owner ON budget_items(current_owner_department_id)
    WHERE workflow_done = FALSE;
CREATE INDEX idx_budget_items_revision ON budget_items(revision_state)
    WHERE revision_state <> 'none';

-- Materialized per-item step ledger
CREATE TABLE steps (
    id BIGSERIAL PRIMARY KEY,
    budget_id BIGINT NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
    budget_item_id BIGINT NOT NULL REFERENCES budget_items(id) ON DELETE CASCADE,
    account_id BIGINT NOT NULL,
    step_name VARCHAR(64) NOT NULL,
    sort_order INTEGER NOT NULL,
    owner_of_step BIGINT NOT NULL,
    step_status VARCHAR(16) NOT NULL DEFAULT 'pending',
    is_current SMALLINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_step_item_order UNIQUE (budget_item_id, sort_order),
    CONSTRAINT chk_step_status CHECK (step_status IN (
        'pending', 'confirmed', 'needed', 'not_needed',
        'in_stock', 'in_partial', 'out_of_stock', 'skipped'
    )),
    CONSTRAINT chk_is_current CHECK (is_current IN (0, 1))
);

-- At most one current step per item
CREATE UNIQUE INDEX uq_steps_single_current ON steps(budget_item_id) WHERE is_current = 1;
CREATE INDEX idx_steps_budget_current ON steps(budget_id) WHERE is_current = 1;
CREATE INDEX idx_steps_owner_current ON steps(owner_of_step) WHERE is_current = 1;

-- Revision answers
CREATE TABLE revision_answers (
    id BIGSERIAL PRIMARY KEY,
    budget_id BIGINT NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
    item_id BIGINT NOT NULL REFERENCES budget_items(id) ON DELETE CASCADE,
    answer_text TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    author_id BIGINT NOT NULL REFERENCES users(id)
);

CREATE INDEX idx_revision_answers_item ON revision_answers(budget_id, item_id, created_at DESC);

-- Direct purchase requests
CREATE TABLE purchasing_requests (
    request_id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id),
    status VARCHAR(16) NOT NULL DEFAULT 'Pending',
    mod_status VARCHAR(16),
    coordinator_status VARCHAR(16),
    revise_comment TEXT,
    revise_comment_by_coordinator TEXT,
    total_amount NUMERIC(14, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    is_printed BOOLEAN NOT NULL DEFAULT FALSE,
    verification_token TEXT,
    CONSTRAINT chk_request_status CHECK (status IN (
        'Pending', 'Forwarded', 'Revised', 'RevisedByUp', 'Approved'
    ))
);

CREATE INDEX idx_purchasing_requests_user ON purchasing_requests(user_id);
CREATE INDEX idx_purchasing_requests_status ON purchasing_requests(status);

CREATE TABLE purchasing_request_items (
    item_id BIGSERIAL PRIMARY KEY,
    request_id BIGINT NOT NULL REFERENCES purchasing_requests(request_id) ON DELETE CASCADE,
    item_name VARCHAR(255) NOT NULL,
    quantity NUMERIC(14, 2) NOT NULL,
    unit VARCHAR(32) NOT NULL,
    unit_price NUMERIC(14, 2) NOT NULL,
    description TEXT,
    total_price NUMERIC(14, 2) NOT NULL,
    mod_decision VARCHAR(16),
    coordinator_decision VARCHAR(16),
    CONSTRAINT chk_mod_decision CHECK (mod_decision IN ('needed', 'not-needed')),
    CONSTRAINT chk_coordinator_decision CHECK (coordinator_decision IN ('needed', 'not-needed'))
);

CREATE INDEX idx_purchasing_request_items_request ON purchasing_request_items(request_id);

-- Append-only route log
CREATE TABLE request_routes (
    id BIGSERIAL PRIMARY KEY,
    request_id BIGINT NOT NULL REFERENCES purchasing_requests(request_id) ON DELETE CASCADE,
    stage VARCHAR(64) NOT NULL,
    user_name VARCHAR(255) NOT NULL,
    time TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_request_routes_request ON request_routes(request_id, time);
"#;

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS request_routes CASCADE;
DROP TABLE IF EXISTS purchasing_request_items CASCADE;
DROP TABLE IF EXISTS purchasing_requests CASCADE;
DROP TABLE IF EXISTS revision_answers CASCADE;
DROP TABLE IF EXISTS steps CASCADE;
DROP TABLE IF EXISTS budget_items CASCADE;
DROP TABLE IF EXISTS budgets CASCADE;
DROP TABLE IF EXISTS workflow_bindings CASCADE;
DROP TABLE IF EXISTS template_stages CASCADE;
DROP TABLE IF EXISTS workflow_templates CASCADE;
DROP TABLE IF EXISTS control_assignments CASCADE;
DROP TABLE IF EXISTS department_areas CASCADE;
DROP TABLE IF EXISTS department_accounts CASCADE;
DROP TABLE IF EXISTS department_schools CASCADE;
DROP TABLE IF EXISTS food_eaters CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS sub_accounts CASCADE;
DROP TABLE IF EXISTS departments CASCADE;
DROP TABLE IF EXISTS schools CASCADE;
";
