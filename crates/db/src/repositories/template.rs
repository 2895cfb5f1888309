//! Template repository for workflow templates, stages, and bindings.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use thiserror::Error;

use bursar_core::template::{Binding, Stage, TemplateError, TemplateStore};

use crate::entities::{template_stages, workflow_bindings, workflow_templates};

/// Errors raised by template persistence.
#[derive(Debug, Error)]
pub enum TemplateRepoError {
    /// Template not found.
    #[error("Template {0} not found")]
    NotFound(i64),

    /// Stage validation failed.
    #[error(transparent)]
    Invalid(#[from] TemplateError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl TemplateRepoError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Invalid(_) => 400,
            Self::Database(_) => 500,
        }
    }
}

/// Input for one stage of a new template.
#[derive(Debug, Clone)]
pub struct CreateStageInput {
    /// Stage name.
    pub stage_name: String,
    /// Position, unique and ≥ 1.
    pub sort_order: i32,
    /// Owning department.
    pub owner_department_id: i64,
    /// Whether reviewers here may send items back.
    pub allow_revise: bool,
}

/// Input for a new template with its stages.
#[derive(Debug, Clone)]
pub struct CreateTemplateInput {
    /// Template name.
    pub name: String,
    /// Ordered stages.
    pub stages: Vec<CreateStageInput>,
}

/// Template repository.
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    db: DatabaseConnection,
}

impl TemplateRepository {
    /// Creates a new template repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a template and its stages in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage list fails validation or the database
    /// fails.
    pub async fn create_template(
        &self,
        input: CreateTemplateInput,
    ) -> Result<workflow_templates::Model, TemplateRepoError> {
        // Validate the stage list shape before writing anything.
        let stages: Vec<Stage> = input
            .stages
            .iter()
            .map(|s| Stage {
                stage_name: s.stage_name.clone(),
                sort_order: s.sort_order,
                owner_department_id: s.owner_department_id,
                allow_revise: s.allow_revise,
            })
            .collect();
        TemplateStore::materialize(0, &stages)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?;

        let template = workflow_templates::ActiveModel {
            name: Set(input.name),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let template = template
            .insert(&txn)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?;

        for stage in input.stages {
            let row = template_stages::ActiveModel {
                template_id: Set(template.id),
                stage_name: Set(stage.stage_name),
                sort_order: Set(stage.sort_order),
                owner_department_id: Set(stage.owner_department_id),
                allow_revise: Set(stage.allow_revise),
                ..Default::default()
            };
            row.insert(&txn)
                .await
                .map_err(|e| TemplateRepoError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?;

        Ok(template)
    }

    /// Lists all templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_templates(
        &self,
    ) -> Result<Vec<workflow_templates::Model>, TemplateRepoError> {
        workflow_templates::Entity::find()
            .order_by_asc(workflow_templates::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))
    }

    /// Loads a template's stages ordered by position.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not exist or the database fails.
    pub async fn stages(&self, template_id: i64) -> Result<Vec<Stage>, TemplateRepoError> {
        workflow_templates::Entity::find_by_id(template_id)
            .one(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?
            .ok_or(TemplateRepoError::NotFound(template_id))?;

        let rows = template_stages::Entity::find()
            .filter(template_stages::Column::TemplateId.eq(template_id))
            .order_by_asc(template_stages::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| Stage {
                stage_name: r.stage_name,
                sort_order: r.sort_order,
                owner_department_id: r.owner_department_id,
                allow_revise: r.allow_revise,
            })
            .collect())
    }

    /// Resolves which template applies to (school, account): lowest binding
    /// priority, ties broken by most-recent creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn resolve_template(
        &self,
        school_id: i64,
        account_id: i64,
    ) -> Result<Option<i64>, TemplateRepoError> {
        let bindings = workflow_bindings::Entity::find()
            .filter(workflow_bindings::Column::SchoolId.eq(school_id))
            .filter(workflow_bindings::Column::AccountId.eq(account_id))
            .all(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?;

        let candidates: Vec<Binding> = bindings
            .into_iter()
            .map(|b| Binding {
                template_id: b.template_id,
                priority: b.priority,
                created_at: b.created_at.into(),
            })
            .collect();

        Ok(TemplateStore::resolve_binding(&candidates))
    }

    /// Binds a template to (school, account) at the given priority.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not exist or the database fails.
    pub async fn create_binding(
        &self,
        school_id: i64,
        account_id: i64,
        template_id: i64,
        priority: i32,
    ) -> Result<workflow_bindings::Model, TemplateRepoError> {
        workflow_templates::Entity::find_by_id(template_id)
            .one(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))?
            .ok_or(TemplateRepoError::NotFound(template_id))?;

        let binding = workflow_bindings::ActiveModel {
            school_id: Set(school_id),
            account_id: Set(account_id),
            template_id: Set(template_id),
            priority: Set(priority),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        binding
            .insert(&self.db)
            .await
            .map_err(|e| TemplateRepoError::Database(e.to_string()))
    }
}
