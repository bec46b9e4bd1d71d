use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InMemoryCaseRepository, InMemoryFactSink};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CasePlan, WorkflowStep};
use crate::domain::ports::{PlanCommit, StepRepository};

/// Plans keyed by case id. Each plan is swapped or patched under one write
/// lock, so readers never see a partial update.
///
/// With stores attached, `commit` also writes case status and facts while
/// holding all three locks.
#[derive(Debug, Default)]
pub struct InMemoryStepRepository {
    plans: RwLock<HashMap<Uuid, CasePlan>>,
    cases: Option<Arc<InMemoryCaseRepository>>,
    facts: Option<Arc<InMemoryFactSink>>,
}

impl InMemoryStepRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose commits also update `cases` and append to `facts`.
    pub fn with_stores(cases: Arc<InMemoryCaseRepository>, facts: Arc<InMemoryFactSink>) -> Self {
        Self {
            plans: RwLock::default(),
            cases: Some(cases),
            facts: Some(facts),
        }
    }
}

/// Check every row token before touching anything.
fn check_versions(plans: &HashMap<Uuid, CasePlan>, steps: &[WorkflowStep]) -> DomainResult<()> {
    for step in steps {
        let stored = plans
            .get(&step.case_id)
            .filter(|p| p.tenant_id == step.tenant_id)
            .and_then(|p| p.step(step.id))
            .ok_or_else(|| DomainError::not_found("Step", step.id))?;
        if stored.version + 1 != step.version {
            return Err(DomainError::ConcurrencyConflict {
                entity: "Step",
                id: step.id.to_string(),
            });
        }
    }
    Ok(())
}

fn apply_steps(plans: &mut HashMap<Uuid, CasePlan>, steps: &[WorkflowStep]) {
    for step in steps {
        if let Some(slot) = plans.get_mut(&step.case_id).and_then(|p| p.step_mut(step.id)) {
            *slot = step.clone();
        }
    }
}

#[async_trait]
impl StepRepository for InMemoryStepRepository {
    async fn load_plan(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<CasePlan> {
        let plans = self.plans.read().await;
        Ok(plans
            .get(&case_id)
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .unwrap_or_else(|| CasePlan::empty(tenant_id, case_id)))
    }

    async fn replace_plan(&self, plan: &CasePlan) -> DomainResult<()> {
        self.plans.write().await.insert(plan.case_id, plan.clone());
        Ok(())
    }

    async fn save_steps(&self, steps: &[WorkflowStep]) -> DomainResult<()> {
        let mut plans = self.plans.write().await;
        check_versions(&plans, steps)?;
        apply_steps(&mut plans, steps);
        Ok(())
    }

    async fn commit(&self, commit: PlanCommit) -> DomainResult<()> {
        // Lock order: cases, plans, facts.
        let mut cases = match &self.cases {
            Some(store) => Some(store.cases.write().await),
            None => None,
        };
        let mut plans = self.plans.write().await;
        let mut facts = match &self.facts {
            Some(sink) => Some(sink.facts.write().await),
            None => None,
        };

        if commit.case_status.is_some() {
            let known = cases
                .as_ref()
                .and_then(|cases| cases.get(&commit.case_id))
                .is_some_and(|case| case.tenant_id == commit.tenant_id);
            if !known {
                return Err(DomainError::not_found("Case", commit.case_id));
            }
        }
        if !commit.facts.is_empty() && facts.is_none() {
            return Err(DomainError::ValidationFailed(
                "no fact sink attached to the step repository".to_string(),
            ));
        }
        check_versions(&plans, &commit.steps)?;

        if let Some(plan) = commit.replacement {
            plans.insert(plan.case_id, plan);
        }
        apply_steps(&mut plans, &commit.steps);
        if let (Some(status), Some(cases)) = (commit.case_status, cases.as_mut()) {
            if let Some(case) = cases.get_mut(&commit.case_id) {
                case.status = status;
                case.updated_at = Utc::now();
            }
        }
        if let (Some(sink), Some(stored)) = (&self.facts, facts.as_mut()) {
            sink.push_bounded(stored, commit.facts);
        }
        Ok(())
    }
}
