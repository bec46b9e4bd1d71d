use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CasePlan;
use crate::services::blueprint_catalog::StepBlueprint;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Validates step graphs and orders them so predecessors come first.
///
/// Graphs here are small (tens of nodes) and index based: `deps[i]` lists the
/// nodes that node `i` depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

// Standalone helper for cycle detection (no self needed)
fn detect_cycle_util(
    node: usize,
    deps: &[Vec<usize>],
    visited: &mut [bool],
    rec_stack: &mut [bool],
    path: &mut Vec<usize>,
) -> bool {
    visited[node] = true;
    rec_stack[node] = true;
    path.push(node);

    for &next in &deps[node] {
        if !visited[next] {
            if detect_cycle_util(next, deps, visited, rec_stack, path) {
                return true;
            }
        } else if rec_stack[next] {
            if let Some(cycle_start) = path.iter().position(|&n| n == next) {
                path.drain(0..cycle_start);
                path.push(next);
                return true;
            }
        }
    }

    rec_stack[node] = false;
    path.pop();
    false
}

/// First cycle found, closed (`[a, b, a]`).
fn find_cycle(deps: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut visited = vec![false; deps.len()];
    let mut rec_stack = vec![false; deps.len()];
    let mut path = Vec::new();

    for node in 0..deps.len() {
        if !visited[node] && detect_cycle_util(node, deps, &mut visited, &mut rec_stack, &mut path) {
            return Some(path);
        }
    }

    None
}

/// Kahn's algorithm. Ties break on the lowest index so output is stable.
/// Returns `None` when nodes remain with nonzero in-degree.
fn topological_indices(deps: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut in_degree = vec![0usize; deps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); deps.len()];

    for (node, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            dependents[dep].push(node);
            in_degree[node] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..deps.len()).filter(|&n| in_degree[n] == 0).collect();
    let mut order = Vec::with_capacity(deps.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &next in &dependents[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    (order.len() == deps.len()).then_some(order)
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Check a blueprint list: unique keys, known dependency keys, no cycles.
    pub fn validate_blueprints(&self, blueprints: &[StepBlueprint]) -> DomainResult<()> {
        self.blueprint_order(blueprints).map(|_| ())
    }

    /// Blueprint keys in dependency order (dependencies before dependents).
    pub fn blueprint_order<'a>(&self, blueprints: &'a [StepBlueprint]) -> DomainResult<Vec<&'a str>> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(blueprints.len());
        for (i, blueprint) in blueprints.iter().enumerate() {
            if index.insert(blueprint.step_key, i).is_some() {
                return Err(DomainError::ValidationFailed(format!(
                    "duplicate step key {}",
                    blueprint.step_key
                )));
            }
        }

        let mut deps = Vec::with_capacity(blueprints.len());
        for blueprint in blueprints {
            let mut node_deps = Vec::with_capacity(blueprint.depends_on.len());
            for dep_key in blueprint.depends_on {
                let dep = index.get(dep_key).ok_or_else(|| {
                    DomainError::ValidationFailed(format!(
                        "step {} depends on unknown step {}",
                        blueprint.step_key, dep_key
                    ))
                })?;
                node_deps.push(*dep);
            }
            deps.push(node_deps);
        }

        let keys: Vec<&str> = blueprints.iter().map(|b| b.step_key).collect();
        order_or_cycle(&deps, &keys).map(|order| order.into_iter().map(|i| keys[i]).collect())
    }

    /// Check a persisted plan: every edge stays inside the plan and the graph
    /// is acyclic.
    pub fn validate_plan(&self, plan: &CasePlan) -> DomainResult<()> {
        self.plan_order(plan).map(|_| ())
    }

    /// Step ids of a plan in dependency order.
    pub fn plan_order(&self, plan: &CasePlan) -> DomainResult<Vec<Uuid>> {
        if let Some(edge) = plan.dangling_dependencies().first() {
            return Err(DomainError::ValidationFailed(format!(
                "dependency {} -> {} references a step outside case {}",
                edge.step_id, edge.depends_on_step_id, plan.case_id
            )));
        }

        let index: HashMap<Uuid, usize> = plan.steps.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let mut deps = vec![Vec::new(); plan.steps.len()];
        for edge in &plan.dependencies {
            if let (Some(&node), Some(&dep)) = (index.get(&edge.step_id), index.get(&edge.depends_on_step_id)) {
                deps[node].push(dep);
            }
        }

        let keys: Vec<&str> = plan.steps.iter().map(|s| s.step_key.as_str()).collect();
        order_or_cycle(&deps, &keys).map(|order| order.into_iter().map(|i| plan.steps[i].id).collect())
    }

    /// Longest predecessor chain below each node; roots have depth 0.
    pub fn calculate_depths(&self, plan: &CasePlan) -> DomainResult<HashMap<Uuid, usize>> {
        let order = self.plan_order(plan)?;
        let mut depths: HashMap<Uuid, usize> = HashMap::with_capacity(order.len());

        for step_id in order {
            let depth = plan
                .dependencies_of(step_id)
                .iter()
                .filter_map(|dep| depths.get(dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depths.insert(step_id, depth);
        }

        Ok(depths)
    }
}

fn order_or_cycle(deps: &[Vec<usize>], keys: &[&str]) -> DomainResult<Vec<usize>> {
    topological_indices(deps).ok_or_else(|| {
        let cycle = find_cycle(deps).unwrap_or_default();
        DomainError::DependencyCycle(cycle.into_iter().map(|i| keys[i].to_string()).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{IntakeFlags, StepDependency, WorkflowStep};
    use crate::services::blueprint_catalog::{blueprints_for, COLLECT_CIVIL_RECORDS, SUBMIT_SUCCESSION_NOTIFICATION};

    fn plan_from(edges: &[(usize, usize)], count: usize) -> CasePlan {
        let tenant = Uuid::new_v4();
        let case = Uuid::new_v4();
        let steps: Vec<WorkflowStep> = (0..count)
            .map(|i| WorkflowStep::new(case, tenant, format!("step-{i}"), format!("Step {i}"), i as u32 + 1))
            .collect();
        let dependencies = edges
            .iter()
            .map(|&(from, to)| StepDependency::new(case, steps[from].id, steps[to].id))
            .collect();
        CasePlan::new(tenant, case, steps, dependencies)
    }

    #[test]
    fn test_catalog_blueprints_are_acyclic_for_every_intake() {
        let resolver = DependencyResolver::new();
        for bits in 0u8..8 {
            let flags = IntakeFlags::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let blueprints = blueprints_for(&flags);
            let order = resolver.blueprint_order(&blueprints).unwrap();
            assert_eq!(order.len(), blueprints.len());

            let position = |key: &str| order.iter().position(|k| *k == key).unwrap();
            for blueprint in &blueprints {
                for dep in blueprint.depends_on {
                    assert!(position(dep) < position(blueprint.step_key));
                }
            }
        }
    }

    #[test]
    fn test_unknown_blueprint_dependency_fails_closed() {
        let blueprints = [StepBlueprint::new("a", "A", &["missing"])];
        let err = DependencyResolver::new().validate_blueprints(&blueprints).unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(msg) if msg.contains("missing")));
    }

    #[test]
    fn test_duplicate_blueprint_key_rejected() {
        let blueprints = [
            StepBlueprint::new(COLLECT_CIVIL_RECORDS, "A", &[]),
            StepBlueprint::new(COLLECT_CIVIL_RECORDS, "B", &[]),
        ];
        assert!(matches!(
            DependencyResolver::new().validate_blueprints(&blueprints),
            Err(DomainError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_blueprint_cycle_reports_path() {
        let blueprints = [
            StepBlueprint::new("a", "A", &["c"]),
            StepBlueprint::new("b", "B", &["a"]),
            StepBlueprint::new("c", "C", &["b"]),
        ];
        match DependencyResolver::new().validate_blueprints(&blueprints) {
            Err(DomainError::DependencyCycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let blueprints = [StepBlueprint::new(SUBMIT_SUCCESSION_NOTIFICATION, "S", &[SUBMIT_SUCCESSION_NOTIFICATION])];
        match DependencyResolver::new().validate_blueprints(&blueprints) {
            Err(DomainError::DependencyCycle(path)) => {
                assert_eq!(path, vec![SUBMIT_SUCCESSION_NOTIFICATION.to_string(); 2]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_order_is_stable() {
        // step-2 depends on step-0 and step-1; step-3 depends on step-2
        let plan = plan_from(&[(2, 0), (2, 1), (3, 2)], 4);
        let order = DependencyResolver::new().plan_order(&plan).unwrap();
        let expected: Vec<Uuid> = plan.steps.iter().map(|s| s.id).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_plan_cycle_detected() {
        let plan = plan_from(&[(0, 1), (1, 0)], 2);
        assert!(matches!(
            DependencyResolver::new().validate_plan(&plan),
            Err(DomainError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_dangling_plan_edge_rejected() {
        let mut plan = plan_from(&[], 1);
        plan.dependencies
            .push(StepDependency::new(plan.case_id, plan.steps[0].id, Uuid::new_v4()));
        assert!(matches!(
            DependencyResolver::new().validate_plan(&plan),
            Err(DomainError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_depths() {
        let plan = plan_from(&[(2, 0), (2, 1), (3, 2)], 4);
        let depths = DependencyResolver::new().calculate_depths(&plan).unwrap();
        assert_eq!(depths[&plan.steps[0].id], 0);
        assert_eq!(depths[&plan.steps[1].id], 0);
        assert_eq!(depths[&plan.steps[2].id], 1);
        assert_eq!(depths[&plan.steps[3].id], 2);
    }
}
