//! Workflow service: the engine's entry points.
//!
//! Composes plan generation, readiness, the status machine, overrides and
//! the workspace ranker over the repository ports. Each mutating operation
//! holds the case lock, computes every change in memory, then commits the
//! steps, case status and facts as one unit.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Case, CasePlan, FactKind, PlanConfig, StepStatus, WorkflowFact, WorkflowStep, WorkspaceConfig,
};
use crate::domain::ports::{CaseRepository, ParticipantResolver, PlanCommit, StepRepository};
use crate::services::case_locks::CaseLocks;
use crate::services::dependency_resolver::DependencyResolver;
use crate::services::plan_generator::PlanGenerator;
use crate::services::readiness::ReadinessEvaluator;
use crate::services::readiness_override::ReadinessOverride;
use crate::services::task_status::{notification_recipients, transition_facts, TaskStatusMachine};
use crate::services::workspace_ranker::{WorkspaceItem, WorkspaceRanker};

/// Who is acting on which case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    pub tenant_id: Uuid,
    pub case_id: Uuid,
    pub actor_user_id: Uuid,
}

impl OperationContext {
    pub fn new(tenant_id: Uuid, case_id: Uuid, actor_user_id: Uuid) -> Self {
        Self {
            tenant_id,
            case_id,
            actor_user_id,
        }
    }
}

/// Result of a status update request.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub step: WorkflowStep,
    pub previous: StepStatus,
    /// `false` when the step already had the requested status
    pub changed: bool,
    /// Keys of steps that became Ready as a result
    pub unblocked: Vec<String>,
}

pub struct WorkflowService<C: CaseRepository, S: StepRepository, P: ParticipantResolver> {
    cases: Arc<C>,
    steps: Arc<S>,
    participants: Arc<P>,
    generator: PlanGenerator,
    evaluator: ReadinessEvaluator,
    machine: TaskStatusMachine,
    ranker: WorkspaceRanker,
    resolver: DependencyResolver,
    locks: CaseLocks,
}

impl<C, S, P> WorkflowService<C, S, P>
where
    C: CaseRepository,
    S: StepRepository,
    P: ParticipantResolver,
{
    pub fn new(cases: Arc<C>, steps: Arc<S>, participants: Arc<P>) -> Self {
        Self {
            cases,
            steps,
            participants,
            generator: PlanGenerator::default(),
            evaluator: ReadinessEvaluator::new(),
            machine: TaskStatusMachine::new(),
            ranker: WorkspaceRanker::new(),
            resolver: DependencyResolver::new(),
            locks: CaseLocks::new(),
        }
    }

    /// Use custom due-date offsets for generated plans.
    pub fn with_plan_config(mut self, config: PlanConfig) -> Self {
        self.generator = PlanGenerator::new(config);
        self
    }

    /// Use custom urgency windows for the workspace.
    pub fn with_workspace_config(mut self, config: WorkspaceConfig) -> Self {
        self.ranker = WorkspaceRanker::from_config(&config);
        self
    }

    /// Generate (or regenerate) the plan of a case from its intake.
    ///
    /// Replaces any existing plan and moves a Draft or Intake case to Active.
    #[instrument(skip(self, cancel), fields(tenant_id = %ctx.tenant_id, case_id = %ctx.case_id))]
    pub async fn generate_plan(&self, ctx: OperationContext, cancel: &CancellationToken) -> DomainResult<CasePlan> {
        let _guard = self.locks.lock(ctx.case_id).await;

        let case = self.load_case(&ctx).await?;
        let previous = self.steps.load_plan(ctx.tenant_id, ctx.case_id).await?;
        let generated = self
            .generator
            .generate(&case, previous.steps.len(), ctx.actor_user_id, Utc::now())?;

        ensure_not_cancelled(cancel)?;
        let commit = PlanCommit::new(ctx.tenant_id, ctx.case_id)
            .replacing(generated.plan.clone())
            .with_case_status(generated.case_transition.map(|(_, to)| to))
            .with_facts(generated.facts);
        self.steps.commit(commit).await?;

        info!(
            steps = generated.plan.steps.len(),
            replaced = previous.steps.len(),
            activated = generated.case_transition.is_some(),
            "Generated workflow plan"
        );
        Ok(generated.plan)
    }

    /// Recompute readiness of every open step. Returns the keys of steps
    /// whose status changed.
    #[instrument(skip(self, cancel), fields(tenant_id = %ctx.tenant_id, case_id = %ctx.case_id))]
    pub async fn recalculate_readiness(
        &self,
        ctx: OperationContext,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<String>> {
        let _guard = self.locks.lock(ctx.case_id).await;

        let case = self.load_case(&ctx).await?;
        let mut plan = self.load_existing_plan(&ctx).await?;
        let now = Utc::now();
        let delta = self.evaluator.recalculate(&mut plan, now);
        if delta.is_empty() {
            return Ok(Vec::new());
        }

        let changed_keys = delta.changed_keys();
        let fact = WorkflowFact::new(case.tenant_id, case.id, FactKind::ReadinessRecalculated, ctx.actor_user_id)
            .at(now)
            .with_payload(json!({
                "trigger": "manual",
                "changedStepKeys": changed_keys,
            }));

        ensure_not_cancelled(cancel)?;
        let commit = PlanCommit::new(ctx.tenant_id, ctx.case_id)
            .with_steps(collect_steps(&plan, &delta.changed_ids()))
            .with_facts(vec![fact]);
        self.steps.commit(commit).await?;

        info!(changed = changed_keys.len(), "Recalculated readiness");
        Ok(changed_keys)
    }

    /// Pin a step to Ready or Blocked with a rationale.
    #[instrument(skip(self, rationale, cancel), fields(tenant_id = %ctx.tenant_id, case_id = %ctx.case_id))]
    pub async fn override_readiness(
        &self,
        ctx: OperationContext,
        step_id: Uuid,
        target: &str,
        rationale: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<WorkflowStep> {
        let request = ReadinessOverride::new(target, rationale, ctx.actor_user_id)?;
        let _guard = self.locks.lock(ctx.case_id).await;

        let case = self.load_case(&ctx).await?;
        let mut plan = self.load_existing_plan(&ctx).await?;
        let now = Utc::now();
        let (step, previous) = request.apply(&mut plan, step_id, now).inspect_err(|e| {
            warn!(error = %e, "Readiness override rejected");
        })?;
        let fact = request.fact(&case, &step, previous, now);

        ensure_not_cancelled(cancel)?;
        let commit = PlanCommit::new(ctx.tenant_id, ctx.case_id)
            .with_steps(vec![step.clone()])
            .with_facts(vec![fact]);
        self.steps.commit(commit).await?;

        info!(step_key = %step.step_key, from = %previous, to = %step.status, "Readiness overridden");
        Ok(step)
    }

    /// Move a step according to a client status token
    /// (`STARTED`, `COMPLETED`, `NEEDSREVIEW`).
    #[instrument(skip(self, note, cancel), fields(tenant_id = %ctx.tenant_id, case_id = %ctx.case_id))]
    pub async fn update_task_status(
        &self,
        ctx: OperationContext,
        step_id: Uuid,
        token: &str,
        note: Option<&str>,
        cancel: &CancellationToken,
    ) -> DomainResult<StatusUpdate> {
        let _guard = self.locks.lock(ctx.case_id).await;

        let case = self.load_case(&ctx).await?;
        let mut plan = self.load_existing_plan(&ctx).await?;
        let current = plan
            .step(step_id)
            .map(|s| s.status)
            .ok_or_else(|| DomainError::not_found("Step", step_id))?;

        let now = Utc::now();
        let outcome = self
            .machine
            .parse_token(current, token)
            .and_then(|target| self.machine.apply(&mut plan, step_id, target, now))
            .inspect_err(|e| warn!(error = %e, token, "Status update rejected"))?;

        let update = StatusUpdate {
            step: outcome.step.clone(),
            previous: outcome.previous,
            changed: outcome.changed,
            unblocked: outcome.readiness.unblocked_keys(),
        };
        if !outcome.changed {
            return Ok(update);
        }

        let participants = self
            .participants
            .accepted_participants(ctx.tenant_id, ctx.case_id)
            .await?;
        let recipients = notification_recipients(&case, &outcome.step, &participants);
        let facts = transition_facts(&case, &outcome, &recipients, note, ctx.actor_user_id, now);

        ensure_not_cancelled(cancel)?;
        let commit = PlanCommit::new(ctx.tenant_id, ctx.case_id)
            .with_steps(collect_steps(&plan, &outcome.touched_ids()))
            .with_facts(facts);
        self.steps.commit(commit).await?;

        info!(
            step_key = %update.step.step_key,
            from = %update.previous,
            to = %update.step.status,
            unblocked = update.unblocked.len(),
            "Task status changed"
        );
        Ok(update)
    }

    /// Ranked view of a case's steps as of `today`. Empty when no plan
    /// exists yet.
    #[instrument(skip(self))]
    pub async fn task_workspace(
        &self,
        tenant_id: Uuid,
        case_id: Uuid,
        today: NaiveDate,
    ) -> DomainResult<Vec<WorkspaceItem>> {
        self.get_case(tenant_id, case_id).await?;
        let plan = self.steps.load_plan(tenant_id, case_id).await?;
        Ok(self.ranker.rank(&plan, today))
    }

    /// Current plan of a case (empty when none has been generated).
    pub async fn plan(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<CasePlan> {
        self.get_case(tenant_id, case_id).await?;
        self.steps.load_plan(tenant_id, case_id).await
    }

    pub async fn get_case(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Case> {
        self.cases
            .get(tenant_id, case_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Case", case_id))
    }

    async fn load_case(&self, ctx: &OperationContext) -> DomainResult<Case> {
        self.get_case(ctx.tenant_id, ctx.case_id).await
    }

    /// Load the case plan, failing when none exists or it is malformed.
    async fn load_existing_plan(&self, ctx: &OperationContext) -> DomainResult<CasePlan> {
        let plan = self.steps.load_plan(ctx.tenant_id, ctx.case_id).await?;
        if plan.is_empty() {
            return Err(DomainError::InvalidCaseState(
                "workflow plan has not been generated".to_string(),
            ));
        }
        self.resolver.validate_plan(&plan)?;
        Ok(plan)
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> DomainResult<()> {
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    Ok(())
}

fn collect_steps(plan: &CasePlan, ids: &[Uuid]) -> Vec<WorkflowStep> {
    ids.iter().filter_map(|id| plan.step(*id).cloned()).collect()
}

/// Today's date in UTC, the reference date for the workspace.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCaseRepository, InMemoryFactSink, InMemoryStepRepository, StaticParticipantResolver,
    };
    use crate::domain::models::{CaseStatus, IntakeFlags};
    use crate::domain::ports::{FactFilter, FactSink};

    type MemoryService = WorkflowService<InMemoryCaseRepository, InMemoryStepRepository, StaticParticipantResolver>;

    async fn setup(flags: IntakeFlags) -> (MemoryService, Arc<InMemoryFactSink>, OperationContext) {
        let cases = Arc::new(InMemoryCaseRepository::new());
        let facts = Arc::new(InMemoryFactSink::new());
        let manager = Uuid::new_v4();
        let case = Case::new(Uuid::new_v4(), "SUC-0001")
            .with_manager(manager)
            .with_intake(&flags);
        cases.insert(&case).await.unwrap();

        let steps = InMemoryStepRepository::with_stores(cases.clone(), facts.clone());
        let service = WorkflowService::new(
            cases.clone(),
            Arc::new(steps),
            Arc::new(StaticParticipantResolver::new(cases)),
        );
        (service, facts, OperationContext::new(case.tenant_id, case.id, manager))
    }

    #[tokio::test]
    async fn test_generate_activates_case() {
        let (service, facts, ctx) = setup(IntakeFlags::default()).await;
        let plan = service.generate_plan(ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(plan.steps.len(), 3);
        let case = service.get_case(ctx.tenant_id, ctx.case_id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Active);
        let recorded = facts.query(FactFilter::new().with_case(ctx.tenant_id, ctx.case_id)).await.unwrap();
        assert_eq!(recorded.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_generation_writes_nothing() {
        let (service, facts, ctx) = setup(IntakeFlags::default()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service.generate_plan(ctx, &cancel).await.unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!(service.plan(ctx.tenant_id, ctx.case_id).await.unwrap().is_empty());
        assert!(facts.query(FactFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_without_plan() {
        let (service, _, ctx) = setup(IntakeFlags::default()).await;
        let err = service
            .update_task_status(ctx, Uuid::new_v4(), "STARTED", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCaseState(_)));
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_see_case() {
        let (service, _, ctx) = setup(IntakeFlags::default()).await;
        let foreign = OperationContext::new(Uuid::new_v4(), ctx.case_id, ctx.actor_user_id);
        let err = service.generate_plan(foreign, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Case", .. }));
    }

    #[tokio::test]
    async fn test_rejected_commit_leaves_case_untouched() {
        let cases = Arc::new(InMemoryCaseRepository::new());
        let case = Case::new(Uuid::new_v4(), "SUC-0002").with_intake(&IntakeFlags::default());
        cases.insert(&case).await.unwrap();
        // No fact store attached, so every commit carrying facts is refused.
        let service = WorkflowService::new(
            cases.clone(),
            Arc::new(InMemoryStepRepository::new()),
            Arc::new(StaticParticipantResolver::new(cases)),
        );
        let ctx = OperationContext::new(case.tenant_id, case.id, Uuid::new_v4());

        let err = service.generate_plan(ctx, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert!(service.plan(ctx.tenant_id, ctx.case_id).await.unwrap().is_empty());
        let stored = service.get_case(ctx.tenant_id, ctx.case_id).await.unwrap();
        assert_eq!(stored.status, case.status);
    }
}
