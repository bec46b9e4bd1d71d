//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use uuid::Uuid;

use caseflow::adapters::memory::{
    InMemoryCaseRepository, InMemoryFactSink, InMemoryStepRepository, StaticParticipantResolver,
};
use caseflow::domain::models::{Case, IntakeFlags, Participant, WorkflowStep};
use caseflow::domain::ports::CaseRepository;
use caseflow::services::{OperationContext, WorkflowService};

pub type MemoryService = WorkflowService<InMemoryCaseRepository, InMemoryStepRepository, StaticParticipantResolver>;

/// A service over in-memory adapters holding one case.
pub struct Harness {
    pub service: MemoryService,
    pub cases: Arc<InMemoryCaseRepository>,
    pub steps: Arc<InMemoryStepRepository>,
    pub facts: Arc<InMemoryFactSink>,
    pub case: Case,
    pub manager: Uuid,
}

impl Harness {
    pub async fn new(flags: IntakeFlags) -> Self {
        Self::with_participants(flags, |_| Vec::new()).await
    }

    /// Build the harness; `participants` receives the case id.
    pub async fn with_participants(flags: IntakeFlags, participants: impl FnOnce(Uuid) -> Vec<Participant>) -> Self {
        let manager = Uuid::new_v4();
        let case = Case::new(Uuid::new_v4(), "SUC-2026-0042")
            .with_manager(manager)
            .with_intake(&flags);
        Self::for_case(case, manager, participants).await
    }

    pub async fn for_case(
        case: Case,
        manager: Uuid,
        participants: impl FnOnce(Uuid) -> Vec<Participant>,
    ) -> Self {
        let cases = Arc::new(InMemoryCaseRepository::new());
        cases.insert(&case).await.expect("insert case");

        let facts = Arc::new(InMemoryFactSink::new());
        let steps = Arc::new(InMemoryStepRepository::with_stores(cases.clone(), facts.clone()));
        let resolver = StaticParticipantResolver::new(cases.clone()).with_participants(participants(case.id));

        let service = WorkflowService::new(cases.clone(), steps.clone(), Arc::new(resolver));
        Self {
            service,
            cases,
            steps,
            facts,
            case,
            manager,
        }
    }

    pub fn ctx(&self) -> OperationContext {
        OperationContext::new(self.case.tenant_id, self.case.id, self.manager)
    }
}

pub fn all_flags() -> IntakeFlags {
    IntakeFlags::new(true, true, true)
}

pub fn step<'a>(steps: &'a [WorkflowStep], key: &str) -> &'a WorkflowStep {
    steps
        .iter()
        .find(|s| s.step_key == key)
        .unwrap_or_else(|| panic!("no step {key}"))
}

pub fn keys(steps: &[WorkflowStep]) -> Vec<&str> {
    steps.iter().map(|s| s.step_key.as_str()).collect()
}
