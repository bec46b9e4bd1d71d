//! Readiness evaluation.
//!
//! Readiness is derived data: given a plan, decide for every open step whether
//! it should be `Ready` or `Blocked`. [`ReadinessEvaluator::evaluate`] is a
//! pure function over the plan; [`ReadinessDelta::apply`] commits the result
//! to the in-memory plan so the caller can persist exactly what changed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::plan::pending_keys;
use crate::domain::models::{CasePlan, StepStatus, WorkflowStep};

/// A single readiness flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub step_id: Uuid,
    pub step_key: String,
    pub from: StepStatus,
    pub to: StepStatus,
    /// Unsatisfied predecessors when `to` is `Blocked`
    pub pending: Vec<String>,
}

/// Changes produced by one evaluation, in sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessDelta {
    pub changes: Vec<StatusChange>,
}

impl ReadinessDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changed_keys(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.step_key.clone()).collect()
    }

    pub fn changed_ids(&self) -> Vec<Uuid> {
        self.changes.iter().map(|c| c.step_id).collect()
    }

    /// Keys of steps this delta moves to `Ready`.
    pub fn unblocked_keys(&self) -> Vec<String> {
        self.changes
            .iter()
            .filter(|c| c.to == StepStatus::Ready)
            .map(|c| c.step_key.clone())
            .collect()
    }

    /// Apply every change to `plan`.
    pub fn apply(&self, plan: &mut CasePlan, now: DateTime<Utc>) {
        for change in &self.changes {
            if let Some(step) = plan.step_mut(change.step_id) {
                step.apply_readiness(change.to == StepStatus::Ready, &change.pending, now);
            }
        }
    }
}

/// Recomputes `Ready` / `Blocked` from predecessor completion.
///
/// Terminal steps and steps with a readiness override are never touched.
/// Every other step becomes `Ready` when all of its predecessors are Complete
/// or Skipped and `Blocked` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessEvaluator;

impl ReadinessEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Whether the evaluator manages this step's status at all.
    pub fn governs(step: &WorkflowStep) -> bool {
        !step.is_terminal() && !step.is_readiness_overridden
    }

    /// Compute the status changes the plan needs, without mutating it.
    ///
    /// Only Complete and Skipped satisfy dependents, and the evaluator only
    /// writes Ready or Blocked, so a single pass reaches the fixed point.
    pub fn evaluate(&self, plan: &CasePlan) -> ReadinessDelta {
        let by_id: HashMap<Uuid, &WorkflowStep> = plan.steps.iter().map(|s| (s.id, s)).collect();

        let changes = plan
            .steps
            .iter()
            .filter(|step| Self::governs(step))
            .filter_map(|step| {
                let pending = pending_keys(&by_id, &plan.dependencies, step.id);
                let desired = if pending.is_empty() {
                    StepStatus::Ready
                } else {
                    StepStatus::Blocked
                };
                (step.status != desired).then(|| StatusChange {
                    step_id: step.id,
                    step_key: step.step_key.clone(),
                    from: step.status,
                    to: desired,
                    pending,
                })
            })
            .collect();

        ReadinessDelta { changes }
    }

    /// Evaluate and apply in one go.
    pub fn recalculate(&self, plan: &mut CasePlan, now: DateTime<Utc>) -> ReadinessDelta {
        let delta = self.evaluate(plan);
        delta.apply(plan, now);
        debug!(
            case_id = %plan.case_id,
            changed = delta.changes.len(),
            "Recalculated readiness"
        );
        delta
    }
}
