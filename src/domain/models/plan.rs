//! Per-case plan aggregate.
//!
//! A [`CasePlan`] owns every step and dependency edge of one case. It is
//! loaded and replaced wholesale; the readiness math runs over it in memory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::step::{StepDependency, WorkflowStep};

/// The full step graph of one case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePlan {
    pub tenant_id: Uuid,
    pub case_id: Uuid,
    /// Steps ordered by sequence
    pub steps: Vec<WorkflowStep>,
    pub dependencies: Vec<StepDependency>,
}

impl CasePlan {
    /// Build a plan, sorting steps by sequence.
    pub fn new(
        tenant_id: Uuid,
        case_id: Uuid,
        mut steps: Vec<WorkflowStep>,
        dependencies: Vec<StepDependency>,
    ) -> Self {
        steps.sort_by_key(|s| s.sequence);
        Self {
            tenant_id,
            case_id,
            steps,
            dependencies,
        }
    }

    pub fn empty(tenant_id: Uuid, case_id: Uuid) -> Self {
        Self {
            tenant_id,
            case_id,
            steps: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, step_id: Uuid) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: Uuid) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    pub fn step_by_key(&self, step_key: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.step_key == step_key)
    }

    /// Predecessor ids of a step, in edge order.
    pub fn dependencies_of(&self, step_id: Uuid) -> Vec<Uuid> {
        self.dependencies
            .iter()
            .filter(|d| d.step_id == step_id)
            .map(|d| d.depends_on_step_id)
            .collect()
    }

    /// Step keys of predecessors that do not yet satisfy `step_id`.
    ///
    /// Unknown predecessor ids count as unsatisfied.
    pub fn pending_dependencies(&self, step_id: Uuid) -> Vec<String> {
        let by_id: HashMap<Uuid, &WorkflowStep> = self.steps.iter().map(|s| (s.id, s)).collect();
        pending_keys(&by_id, &self.dependencies, step_id)
    }

    /// All predecessors are Complete or Skipped. Vacuously true without edges.
    pub fn is_satisfied(&self, step_id: Uuid) -> bool {
        self.pending_dependencies(step_id).is_empty()
    }

    /// Dependency edges whose endpoints are not both steps of this plan.
    pub fn dangling_dependencies(&self) -> Vec<StepDependency> {
        self.dependencies
            .iter()
            .filter(|d| self.step(d.step_id).is_none() || self.step(d.depends_on_step_id).is_none())
            .copied()
            .collect()
    }
}

/// Pending predecessor keys for `step_id` against an id index.
pub(crate) fn pending_keys(
    by_id: &HashMap<Uuid, &WorkflowStep>,
    dependencies: &[StepDependency],
    step_id: Uuid,
) -> Vec<String> {
    dependencies
        .iter()
        .filter(|d| d.step_id == step_id)
        .filter_map(|d| match by_id.get(&d.depends_on_step_id) {
            Some(dep) if dep.status.satisfies_dependents() => None,
            Some(dep) => Some(dep.step_key.clone()),
            None => Some(d.depends_on_step_id.to_string()),
        })
        .collect()
}
