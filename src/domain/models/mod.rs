pub mod case;
pub mod config;
pub mod fact;
pub mod plan;
pub mod step;

pub use case::{Case, CaseStatus, IntakeFlags, Participant, Role};
pub use config::{Config, DatabaseConfig, LoggingConfig, PlanConfig, WorkspaceConfig};
pub use fact::{FactKind, WorkflowFact};
pub use plan::CasePlan;
pub use step::{BlockedReasonCode, DeadlineSource, StepDependency, StepStatus, WorkflowStep};
