//! Plan generation from a case's intake.
//!
//! Turns the blueprints selected for a case into concrete steps with
//! sequence numbers, default due dates and dependency edges. Pure: the
//! workflow service persists the result.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Case, CasePlan, CaseStatus, DeadlineSource, FactKind, PlanConfig, StepDependency, WorkflowFact, WorkflowStep,
};
use crate::services::blueprint_catalog::blueprints_for;
use crate::services::dependency_resolver::DependencyResolver;

/// Result of generating a plan: the new plan, the case status move it
/// implies, and the facts describing it.
#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: CasePlan,
    /// `(from, to)` when generation activates the case
    pub case_transition: Option<(CaseStatus, CaseStatus)>,
    pub facts: Vec<WorkflowFact>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanGenerator {
    config: PlanConfig,
    resolver: DependencyResolver,
}

impl PlanGenerator {
    pub fn new(config: PlanConfig) -> Self {
        Self {
            config,
            resolver: DependencyResolver::new(),
        }
    }

    /// Due date offset in days for a step at `sequence`.
    pub fn due_offset_days(&self, sequence: u32) -> i64 {
        self.config.due_base_days + self.config.due_days_per_step * i64::from(sequence)
    }

    /// Build a fresh plan for `case`.
    ///
    /// `replaced_steps` is the size of the plan being replaced, reported in
    /// the plan fact.
    pub fn generate(
        &self,
        case: &Case,
        replaced_steps: usize,
        actor_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<GeneratedPlan> {
        if case.status.is_terminal() {
            return Err(DomainError::InvalidCaseState(format!(
                "case is {}",
                case.status.as_str()
            )));
        }
        let flags = case.intake_flags()?;

        let blueprints = blueprints_for(&flags);
        self.resolver.validate_blueprints(&blueprints)?;

        let today = now.date_naive();
        let mut ids: HashMap<&str, Uuid> = HashMap::with_capacity(blueprints.len());
        let mut steps = Vec::with_capacity(blueprints.len());

        for (position, blueprint) in blueprints.iter().enumerate() {
            let sequence = position as u32 + 1;
            let due_date = today + Duration::days(self.due_offset_days(sequence));

            let mut step = WorkflowStep::new(case.id, case.tenant_id, blueprint.step_key, blueprint.title, sequence)
                .with_assignee(case.manager_user_id)
                .with_due_date(due_date, DeadlineSource::PlanDefault);
            step.created_at = now;

            // Nothing is complete yet, so every predecessor is pending.
            let pending: Vec<String> = blueprint.depends_on.iter().map(|k| k.to_string()).collect();
            step.apply_readiness(pending.is_empty(), &pending, now);
            step.version = 1;

            ids.insert(blueprint.step_key, step.id);
            steps.push(step);
        }

        let mut dependencies = Vec::new();
        for blueprint in &blueprints {
            let step_id = ids[blueprint.step_key];
            for dep_key in blueprint.depends_on {
                let depends_on = ids.get(dep_key).ok_or_else(|| {
                    DomainError::ValidationFailed(format!("unknown dependency {dep_key}"))
                })?;
                dependencies.push(StepDependency::new(case.id, step_id, *depends_on));
            }
        }

        let plan = CasePlan::new(case.tenant_id, case.id, steps, dependencies);
        debug!(
            case_id = %case.id,
            steps = plan.steps.len(),
            edges = plan.dependencies.len(),
            "Generated case plan"
        );

        let case_transition = case
            .status
            .activates_on_plan()
            .then_some((case.status, CaseStatus::Active));

        let facts = self.facts_for(case, &plan, case_transition, replaced_steps, actor_user_id, now);

        Ok(GeneratedPlan {
            plan,
            case_transition,
            facts,
        })
    }

    fn facts_for(
        &self,
        case: &Case,
        plan: &CasePlan,
        case_transition: Option<(CaseStatus, CaseStatus)>,
        replaced_steps: usize,
        actor_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Vec<WorkflowFact> {
        let step_keys: Vec<&str> = plan.steps.iter().map(|s| s.step_key.as_str()).collect();

        let mut facts = vec![
            WorkflowFact::new(case.tenant_id, case.id, FactKind::PlanGenerated, actor_user_id)
                .at(now)
                .with_payload(json!({
                    "stepCount": plan.steps.len(),
                    "stepKeys": step_keys,
                    "replacedStepCount": replaced_steps,
                })),
            WorkflowFact::new(case.tenant_id, case.id, FactKind::OwnershipInitialized, actor_user_id)
                .at(now)
                .with_payload(json!({
                    "assignedUserId": case.manager_user_id,
                    "stepCount": plan.steps.len(),
                })),
        ];

        if let Some((from, to)) = case_transition {
            facts.push(
                WorkflowFact::new(case.tenant_id, case.id, FactKind::CaseStatusChanged, actor_user_id)
                    .at(now)
                    .with_payload(json!({
                        "from": from.as_str(),
                        "to": to.as_str(),
                        "reason": "plan generated",
                    })),
            );
        }

        facts
    }
}
