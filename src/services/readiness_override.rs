//! Manual readiness override.
//!
//! Lets an authorized user pin a step to `Ready` or `Blocked` regardless of
//! its predecessors. The pin is one-way: once set, the readiness evaluator
//! leaves the step alone.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BlockedReasonCode, Case, CasePlan, FactKind, StepStatus, WorkflowFact, WorkflowStep};

/// Status an override may pin a step to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideTarget {
    Ready,
    Blocked,
}

impl OverrideTarget {
    /// Parse `ready` / `blocked` in any case.
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "ready" => Ok(Self::Ready),
            "blocked" => Ok(Self::Blocked),
            other => Err(DomainError::ValidationFailed(format!(
                "override target must be ready or blocked, got '{other}'"
            ))),
        }
    }

    pub fn status(&self) -> StepStatus {
        match self {
            Self::Ready => StepStatus::Ready,
            Self::Blocked => StepStatus::Blocked,
        }
    }
}

/// An override request after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessOverride {
    pub target: OverrideTarget,
    pub rationale: String,
    pub actor_user_id: Uuid,
}

impl ReadinessOverride {
    /// Validate raw input. The rationale is trimmed and must not be empty.
    pub fn new(target: &str, rationale: &str, actor_user_id: Uuid) -> DomainResult<Self> {
        let target = OverrideTarget::parse(target)?;
        let rationale = rationale.trim();
        if rationale.is_empty() {
            return Err(DomainError::ValidationFailed(
                "override rationale is required".to_string(),
            ));
        }
        Ok(Self {
            target,
            rationale: rationale.to_string(),
            actor_user_id,
        })
    }

    /// Pin `step_id` in `plan`. Returns the updated step and its previous
    /// status.
    pub fn apply(
        &self,
        plan: &mut CasePlan,
        step_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<(WorkflowStep, StepStatus)> {
        let step = plan
            .step_mut(step_id)
            .ok_or_else(|| DomainError::not_found("Step", step_id))?;
        let previous = step.status;

        if step.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: previous.as_str().to_string(),
                to: self.target.status().as_str().to_string(),
                reason: "cannot override readiness of a closed step".to_string(),
            });
        }

        step.is_readiness_overridden = true;
        step.readiness_override_rationale = Some(self.rationale.clone());
        step.readiness_override_by_user_id = Some(self.actor_user_id);
        step.readiness_overridden_at = Some(now);

        match self.target {
            OverrideTarget::Ready => {
                step.blocked_reason_code = None;
                step.blocked_reason_detail = None;
            }
            OverrideTarget::Blocked => {
                step.blocked_reason_code = Some(BlockedReasonCode::ManualOverride);
                step.blocked_reason_detail = Some(self.rationale.clone());
            }
        }
        step.set_status(self.target.status(), now);

        Ok((step.clone(), previous))
    }

    pub fn fact(&self, case: &Case, step: &WorkflowStep, previous: StepStatus, now: DateTime<Utc>) -> WorkflowFact {
        WorkflowFact::new(case.tenant_id, case.id, FactKind::ReadinessOverridden, self.actor_user_id)
            .at(now)
            .with_payload(json!({
                "stepId": step.id,
                "stepKey": step.step_key,
                "from": previous.as_str(),
                "to": step.status.as_str(),
                "rationale": self.rationale,
            }))
    }
}
