//! Task status state machine.
//!
//! Maps client tokens onto step statuses, gates moves on the transition table
//! and on predecessor completion, and describes accepted moves as facts.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, CasePlan, FactKind, Participant, StepStatus, WorkflowFact, WorkflowStep};
use crate::services::readiness::{ReadinessDelta, ReadinessEvaluator};

/// Status tokens accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    Started,
    Completed,
    NeedsReview,
}

impl StatusToken {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STARTED" => Some(Self::Started),
            "COMPLETED" => Some(Self::Completed),
            "NEEDSREVIEW" => Some(Self::NeedsReview),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::NeedsReview => "NEEDSREVIEW",
        }
    }

    pub fn target(&self) -> StepStatus {
        match self {
            Self::Started => StepStatus::InProgress,
            Self::Completed => StepStatus::Complete,
            Self::NeedsReview => StepStatus::AwaitingEvidence,
        }
    }
}

/// Whether the transition table allows `from -> to`.
pub fn is_allowed(from: StepStatus, to: StepStatus) -> bool {
    use StepStatus::*;
    match to {
        InProgress => matches!(from, Ready | Overdue | AwaitingEvidence),
        AwaitingEvidence => matches!(from, Ready | Overdue | InProgress),
        Complete => matches!(from, Ready | Overdue | InProgress | AwaitingEvidence),
        _ => false,
    }
}

/// Targets that require predecessors to be satisfied.
fn requires_dependencies(to: StepStatus) -> bool {
    matches!(
        to,
        StepStatus::InProgress | StepStatus::AwaitingEvidence | StepStatus::Complete
    )
}

/// Outcome of an accepted status request.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The step after the move
    pub step: WorkflowStep,
    pub previous: StepStatus,
    /// `false` for a same-status request, which writes nothing
    pub changed: bool,
    /// Readiness changes triggered by a completion
    pub readiness: ReadinessDelta,
}

impl TransitionOutcome {
    /// Ids of every step the move touched, the target step first.
    pub fn touched_ids(&self) -> Vec<Uuid> {
        if !self.changed {
            return Vec::new();
        }
        let mut ids = vec![self.step.id];
        ids.extend(self.readiness.changed_ids());
        ids
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStatusMachine {
    evaluator: ReadinessEvaluator,
}

impl TaskStatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a client token into its target status.
    pub fn parse_token(&self, from: StepStatus, token: &str) -> DomainResult<StepStatus> {
        StatusToken::from_str(token)
            .map(|t| t.target())
            .ok_or_else(|| DomainError::InvalidTransition {
                from: from.as_str().to_string(),
                to: token.to_string(),
                reason: "unknown status token".to_string(),
            })
    }

    /// Check that `step_id` may move to `to` in `plan`.
    ///
    /// Returns `Ok(false)` for a same-status no-op.
    pub fn check(&self, plan: &CasePlan, step_id: Uuid, to: StepStatus) -> DomainResult<bool> {
        let step = plan
            .step(step_id)
            .ok_or_else(|| DomainError::not_found("Step", step_id))?;
        let from = step.status;

        if from == to {
            return Ok(false);
        }

        if from.is_terminal() {
            return Err(invalid(from, to, "step is already closed"));
        }

        if requires_dependencies(to) && !step.is_readiness_overridden {
            let pending = plan.pending_dependencies(step_id);
            if !pending.is_empty() {
                return Err(DomainError::DependenciesNotSatisfied {
                    step_key: step.step_key.clone(),
                    pending,
                });
            }
        }

        if !is_allowed(from, to) {
            return Err(invalid(from, to, "transition not allowed"));
        }

        Ok(true)
    }

    /// Apply a checked move to `plan`. A completion re-evaluates readiness
    /// of the rest of the plan.
    pub fn apply(
        &self,
        plan: &mut CasePlan,
        step_id: Uuid,
        to: StepStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionOutcome> {
        let changed = self.check(plan, step_id, to)?;

        let step = plan
            .step_mut(step_id)
            .ok_or_else(|| DomainError::not_found("Step", step_id))?;
        let previous = step.status;

        if !changed {
            return Ok(TransitionOutcome {
                step: step.clone(),
                previous,
                changed,
                readiness: ReadinessDelta::default(),
            });
        }

        step.blocked_reason_code = None;
        step.blocked_reason_detail = None;
        step.set_status(to, now);
        let step = step.clone();

        let readiness = if to == StepStatus::Complete {
            self.evaluator.recalculate(plan, now)
        } else {
            ReadinessDelta::default()
        };

        Ok(TransitionOutcome {
            step,
            previous,
            changed,
            readiness,
        })
    }
}

fn invalid(from: StepStatus, to: StepStatus, reason: &str) -> DomainError {
    DomainError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
        reason: reason.to_string(),
    }
}

/// Users to notify about a change on `step`: the case manager, the assignee
/// and every accepted participant, without duplicates.
pub fn notification_recipients(case: &Case, step: &WorkflowStep, participants: &[Participant]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    case.manager_user_id
        .into_iter()
        .chain(step.assigned_user_id)
        .chain(participants.iter().filter(|p| p.accepted).map(|p| p.user_id))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Facts describing an accepted, state-changing move.
pub fn transition_facts(
    case: &Case,
    outcome: &TransitionOutcome,
    recipients: &[Uuid],
    note: Option<&str>,
    actor_user_id: Uuid,
    now: DateTime<Utc>,
) -> Vec<WorkflowFact> {
    let step = &outcome.step;
    let fact = |kind: FactKind| WorkflowFact::new(case.tenant_id, case.id, kind, actor_user_id).at(now);

    let mut facts = vec![fact(FactKind::TaskStatusChanged).with_payload(json!({
        "stepId": step.id,
        "stepKey": step.step_key,
        "from": outcome.previous.as_str(),
        "to": step.status.as_str(),
    }))];

    if !outcome.readiness.is_empty() {
        facts.push(fact(FactKind::ReadinessRecalculated).with_payload(json!({
            "trigger": "step-completed",
            "triggerStepKey": step.step_key,
            "changedStepKeys": outcome.readiness.changed_keys(),
        })));
    }

    facts.push(fact(FactKind::StatusChangedNotification).with_payload(json!({
        "stepId": step.id,
        "stepKey": step.step_key,
        "title": step.title,
        "status": step.status.as_str(),
        "recipients": recipients,
    })));

    if step.status == StepStatus::AwaitingEvidence {
        facts.push(fact(FactKind::MissingInputRequired).with_payload(json!({
            "stepId": step.id,
            "stepKey": step.step_key,
            "note": note,
            "recipients": recipients,
        })));
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Role, StepDependency};

    fn chain_plan() -> (CasePlan, Uuid, Uuid) {
        let tenant = Uuid::new_v4();
        let case = Uuid::new_v4();
        let mut first = WorkflowStep::new(case, tenant, "first", "First", 1);
        let mut second = WorkflowStep::new(case, tenant, "second", "Second", 2);
        first.status = StepStatus::Ready;
        second.status = StepStatus::Blocked;
        let (a, b) = (first.id, second.id);
        let plan = CasePlan::new(tenant, case, vec![first, second], vec![StepDependency::new(case, b, a)]);
        (plan, a, b)
    }

    #[test]
    fn test_token_parsing_is_case_insensitive() {
        assert_eq!(StatusToken::from_str("started"), Some(StatusToken::Started));
        assert_eq!(StatusToken::from_str("Completed"), Some(StatusToken::Completed));
        assert_eq!(StatusToken::from_str("needsReview"), Some(StatusToken::NeedsReview));
        assert_eq!(StatusToken::from_str("DONE"), None);
    }

    #[test]
    fn test_unknown_token_is_invalid_transition() {
        let err = TaskStatusMachine::new()
            .parse_token(StepStatus::Ready, "FINISHED")
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_transition_table() {
        use StepStatus::*;
        assert!(is_allowed(Ready, InProgress));
        assert!(is_allowed(Overdue, InProgress));
        assert!(is_allowed(AwaitingEvidence, InProgress));
        assert!(is_allowed(InProgress, AwaitingEvidence));
        assert!(is_allowed(InProgress, Complete));
        assert!(is_allowed(AwaitingEvidence, Complete));
        assert!(!is_allowed(Blocked, InProgress));
        assert!(!is_allowed(NotStarted, Complete));
        assert!(!is_allowed(Complete, InProgress));
        assert!(!is_allowed(Ready, Skipped));
        for from in StepStatus::ALL {
            assert!(!is_allowed(from, Ready));
            assert!(!is_allowed(from, Blocked));
        }
    }

    #[test]
    fn test_complete_blocked_step_reports_dependencies() {
        let (plan, _, b) = chain_plan();
        let err = TaskStatusMachine::new()
            .check(&plan, b, StepStatus::Complete)
            .unwrap_err();
        match err {
            DomainError::DependenciesNotSatisfied { step_key, pending } => {
                assert_eq!(step_key, "second");
                assert_eq!(pending, vec!["first".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_override_bypasses_dependency_gate() {
        let (mut plan, _, b) = chain_plan();
        {
            let step = plan.step_mut(b).unwrap();
            step.status = StepStatus::Ready;
            step.is_readiness_overridden = true;
        }
        assert!(TaskStatusMachine::new().check(&plan, b, StepStatus::InProgress).unwrap());
    }

    #[test]
    fn test_same_status_is_noop() {
        let (mut plan, a, _) = chain_plan();
        let outcome = TaskStatusMachine::new()
            .apply(&mut plan, a, StepStatus::Ready, Utc::now())
            .unwrap();
        assert!(!outcome.changed);
        assert!(outcome.touched_ids().is_empty());
        assert_eq!(plan.step(a).unwrap().version, 1);
    }

    #[test]
    fn test_closed_step_cannot_move() {
        let (mut plan, a, _) = chain_plan();
        plan.step_mut(a).unwrap().status = StepStatus::Complete;
        assert!(matches!(
            TaskStatusMachine::new().check(&plan, a, StepStatus::InProgress),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_completion_unblocks_dependent() {
        let (mut plan, a, b) = chain_plan();
        let machine = TaskStatusMachine::new();
        machine.apply(&mut plan, a, StepStatus::InProgress, Utc::now()).unwrap();
        let outcome = machine.apply(&mut plan, a, StepStatus::Complete, Utc::now()).unwrap();

        assert_eq!(outcome.previous, StepStatus::InProgress);
        assert_eq!(outcome.step.status, StepStatus::Complete);
        assert_eq!(outcome.readiness.unblocked_keys(), vec!["second".to_string()]);
        assert_eq!(outcome.touched_ids(), vec![a, b]);
        assert_eq!(plan.step(b).unwrap().status, StepStatus::Ready);
    }

    #[test]
    fn test_unknown_step_not_found() {
        let (plan, _, _) = chain_plan();
        assert!(matches!(
            TaskStatusMachine::new().check(&plan, Uuid::new_v4(), StepStatus::Complete),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn test_recipients_are_deduplicated() {
        let manager = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let pending = Uuid::new_v4();
        let case = Case::new(Uuid::new_v4(), "SUC-1").with_manager(manager);
        let step = WorkflowStep::new(case.id, case.tenant_id, "k", "K", 1).with_assignee(Some(manager));
        let participants = vec![
            Participant { case_id: case.id, user_id: editor, role: Role::Editor, accepted: true },
            Participant { case_id: case.id, user_id: manager, role: Role::Manager, accepted: true },
            Participant { case_id: case.id, user_id: pending, role: Role::Viewer, accepted: false },
        ];
        assert_eq!(notification_recipients(&case, &step, &participants), vec![manager, editor]);
    }

    #[test]
    fn test_needs_review_emits_missing_input() {
        let (mut plan, a, _) = chain_plan();
        let case = Case::new(plan.tenant_id, "SUC-2");
        let outcome = TaskStatusMachine::new()
            .apply(&mut plan, a, StepStatus::AwaitingEvidence, Utc::now())
            .unwrap();
        let facts = transition_facts(&case, &outcome, &[], Some("death certificate"), Uuid::new_v4(), Utc::now());
        let kinds: Vec<FactKind> = facts.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FactKind::TaskStatusChanged,
                FactKind::StatusChangedNotification,
                FactKind::MissingInputRequired
            ]
        );
        assert_eq!(facts[2].payload["note"], "death certificate");
    }
}
