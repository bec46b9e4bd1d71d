use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CasePlan, CaseStatus, WorkflowFact, WorkflowStep};

/// Everything one engine operation writes for a case.
///
/// Committed as a unit: either every part is persisted or none is.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCommit {
    pub tenant_id: Uuid,
    pub case_id: Uuid,
    /// New plan replacing the stored one
    pub replacement: Option<CasePlan>,
    /// Version-guarded updates to stored steps
    pub steps: Vec<WorkflowStep>,
    pub case_status: Option<CaseStatus>,
    pub facts: Vec<WorkflowFact>,
}

impl PlanCommit {
    pub fn new(tenant_id: Uuid, case_id: Uuid) -> Self {
        Self {
            tenant_id,
            case_id,
            replacement: None,
            steps: Vec::new(),
            case_status: None,
            facts: Vec::new(),
        }
    }

    pub fn replacing(mut self, plan: CasePlan) -> Self {
        self.replacement = Some(plan);
        self
    }

    pub fn with_steps(mut self, steps: Vec<WorkflowStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_case_status(mut self, status: Option<CaseStatus>) -> Self {
        self.case_status = status;
        self
    }

    pub fn with_facts(mut self, facts: Vec<WorkflowFact>) -> Self {
        self.facts = facts;
        self
    }
}

/// Repository port for a case's steps and dependency edges.
#[async_trait]
pub trait StepRepository: Send + Sync {
    /// Load every step and edge of a case. Returns an empty plan when none
    /// has been generated.
    async fn load_plan(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<CasePlan>;

    /// Delete the case's existing plan and insert `plan` in its place.
    ///
    /// Readers observe either the old plan or the new one, never a mix.
    async fn replace_plan(&self, plan: &CasePlan) -> DomainResult<()>;

    /// Persist mutated steps as one batch.
    ///
    /// Each step is written only if the stored version is `step.version - 1`;
    /// otherwise the whole batch fails with `ConcurrencyConflict` and nothing
    /// is written.
    async fn save_steps(&self, steps: &[WorkflowStep]) -> DomainResult<()>;

    /// Apply the plan replacement, step updates, case status and facts of
    /// `commit` atomically. Step updates follow the `save_steps` version
    /// rule; an unknown case fails with `NotFound`. On any error nothing is
    /// persisted.
    async fn commit(&self, commit: PlanCommit) -> DomainResult<()>;
}
