//! Caseflow - case workflow plan and readiness engine
//!
//! Caseflow turns the intake answers of an estate succession case into a
//! dependency-ordered workflow plan and keeps each step's readiness,
//! status and presentation order consistent as work progresses.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Service Layer** (`services`): plan generation, readiness, the task
//!   status machine, overrides and the workspace ranker
//! - **Adapters** (`adapters`): in-memory and SQLite implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): operator command line
//!
//! # Example
//!
//! ```ignore
//! use caseflow::adapters::memory::*;
//! use caseflow::services::{OperationContext, WorkflowService};
//!
//! let steps = Arc::new(InMemoryStepRepository::with_stores(cases.clone(), facts.clone()));
//! let service = WorkflowService::new(cases, steps, participants);
//! let plan = service.generate_plan(OperationContext::new(tenant, case, manager), &cancel).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Case, CasePlan, CaseStatus, Config, IntakeFlags, Participant, Role, StepStatus, WorkflowFact, WorkflowStep,
};
pub use domain::ports::{CaseRepository, FactSink, ParticipantResolver, StepRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{OperationContext, WorkflowService};
