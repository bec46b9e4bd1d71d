pub mod blueprint_catalog;
pub mod case_locks;
pub mod dependency_resolver;
pub mod plan_generator;
pub mod readiness;
pub mod readiness_override;
pub mod task_status;
pub mod workflow_service;
pub mod workspace_ranker;

pub use blueprint_catalog::{blueprints_for, StepBlueprint};
pub use case_locks::CaseLocks;
pub use dependency_resolver::DependencyResolver;
pub use plan_generator::{GeneratedPlan, PlanGenerator};
pub use readiness::{ReadinessDelta, ReadinessEvaluator, StatusChange};
pub use readiness_override::{OverrideTarget, ReadinessOverride};
pub use task_status::{StatusToken, TaskStatusMachine, TransitionOutcome};
pub use workflow_service::{today_utc, OperationContext, StatusUpdate, WorkflowService};
pub use workspace_ranker::{priority_rank, UrgencyIndicator, WorkspaceItem, WorkspaceRanker};
