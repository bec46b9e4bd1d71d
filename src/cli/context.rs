//! Wiring of the SQLite adapters and the workflow service for one CLI run.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteCaseRepository, SqliteFactSink, SqliteParticipantRepository,
    SqliteStepRepository,
};
use crate::domain::models::{Config, Role};
use crate::domain::ports::ParticipantResolver;
use crate::services::{OperationContext, WorkflowService};

pub type SqliteWorkflowService = WorkflowService<SqliteCaseRepository, SqliteStepRepository, SqliteParticipantRepository>;

/// Everything a command needs: repositories, the service and the caller.
pub struct CliContext {
    tenant: Option<Uuid>,
    actor: Option<Uuid>,
    pub cases: Arc<SqliteCaseRepository>,
    pub participants: Arc<SqliteParticipantRepository>,
    pub facts: Arc<SqliteFactSink>,
    pub service: SqliteWorkflowService,
    pub cancel: CancellationToken,
}

impl CliContext {
    /// Open the configured database (migrating it if needed) and build the
    /// service on top of it.
    pub async fn open(config: &Config, tenant: Option<Uuid>, actor: Option<Uuid>) -> Result<Self> {
        let pool = initialize_database(&config.database.url(), Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        let cases = Arc::new(SqliteCaseRepository::new(pool.clone()));
        let steps = Arc::new(SqliteStepRepository::new(pool.clone()));
        let participants = Arc::new(SqliteParticipantRepository::new(pool.clone()));
        let facts = Arc::new(SqliteFactSink::new(pool));

        let service = WorkflowService::new(cases.clone(), steps, participants.clone())
            .with_plan_config(config.plan)
            .with_workspace_config(config.workspace);

        Ok(Self {
            tenant,
            actor,
            cases,
            participants,
            facts,
            service,
            cancel: CancellationToken::new(),
        })
    }

    pub fn tenant(&self) -> Result<Uuid> {
        self.tenant
            .ok_or_else(|| anyhow!("No tenant given. Pass --tenant or set CASEFLOW_TENANT."))
    }

    pub fn actor(&self) -> Result<Uuid> {
        self.actor
            .ok_or_else(|| anyhow!("No acting user given. Pass --actor or set CASEFLOW_ACTOR."))
    }

    /// Check that the actor holds at least `minimum` on `case_id` and build
    /// the operation context for the engine.
    pub async fn authorize(&self, case_id: Uuid, minimum: Role) -> Result<OperationContext> {
        let tenant_id = self.tenant()?;
        let actor = self.actor()?;
        self.service.get_case(tenant_id, case_id).await?;

        let role = self.participants.effective_role(tenant_id, case_id, actor).await?;
        match role {
            Some(role) if role.at_least(minimum) => Ok(OperationContext::new(tenant_id, case_id, actor)),
            Some(role) => {
                tracing::warn!(%case_id, %actor, %role, required = %minimum, "Operation denied");
                bail!("User {actor} is {role} on case {case_id}; this operation requires {minimum} or above")
            }
            None => {
                tracing::warn!(%case_id, %actor, required = %minimum, "Operation denied");
                bail!("User {actor} is not a participant of case {case_id}")
            }
        }
    }

    /// Resolve a step given by id or by step key.
    pub async fn resolve_step(&self, case_id: Uuid, reference: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(id);
        }

        let plan = self.service.plan(self.tenant()?, case_id).await?;
        plan.step_by_key(reference.trim())
            .map(|step| step.id)
            .ok_or_else(|| anyhow!("No step '{reference}' in case {case_id}. Use 'caseflow step list' to see steps."))
    }
}
