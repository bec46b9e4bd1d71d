//! Domain errors for the Caseflow engine.

use thiserror::Error;

/// Format a cycle path as a human-readable string: `a -> b -> a`.
fn format_cycle_path(path: &[String]) -> String {
    path.join(" -> ")
}

/// Domain-level errors raised by engine operations.
///
/// Every variant is a deterministic failure resolved from the current step
/// graph; none are retried internally.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required case precondition has not been met.
    #[error("Invalid case state: {0}")]
    InvalidCaseState(String),

    /// Status value not recognized or not reachable from the current status.
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition { from: String, to: String, reason: String },

    /// The transition table allows the move but predecessors are incomplete.
    #[error("Dependencies not satisfied for step {step_key}: waiting on {}", .pending.join(", "))]
    DependenciesNotSatisfied { step_key: String, pending: Vec<String> },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Step dependency cycle detected: {}", format_cycle_path(.0))]
    DependencyCycle(Vec<String>),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: &'static str, id: String },

    #[error("Operation cancelled before commit")]
    Cancelled,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the failure surfaces to callers as a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::InvalidCaseState(_)
                | Self::InvalidTransition { .. }
                | Self::DependenciesNotSatisfied { .. }
                | Self::ConcurrencyConflict { .. }
        )
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
