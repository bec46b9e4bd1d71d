//! Port trait definitions (Hexagonal Architecture)
//!
//! The engine reaches its collaborators only through these traits:
//! - CaseRepository: case lookup and status updates
//! - StepRepository: whole-plan loads and atomic commits of an operation
//! - ParticipantResolver: notification fan-out and actor roles
//! - FactSink: audit and notification facts

pub mod case_repository;
pub mod fact_sink;
pub mod participant_resolver;
pub mod step_repository;

pub use case_repository::CaseRepository;
pub use fact_sink::{FactFilter, FactSink};
pub use participant_resolver::ParticipantResolver;
pub use step_repository::{PlanCommit, StepRepository};
