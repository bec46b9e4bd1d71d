//! Workflow step domain model.
//!
//! Steps are the units of work in a case's plan. They form a DAG through
//! [`StepDependency`] edges and are materialized in one batch by the plan
//! generator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step exists but readiness has not been evaluated
    NotStarted,
    /// All predecessors are satisfied; the step may be started
    Ready,
    /// At least one predecessor is not yet complete
    Blocked,
    /// An operator is working the step
    InProgress,
    /// Work is paused pending documents or other input
    AwaitingEvidence,
    /// Step finished
    Complete,
    /// Step was skipped
    Skipped,
    /// Display state for late work
    Overdue,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Ready => "ready",
            Self::Blocked => "blocked",
            Self::InProgress => "in_progress",
            Self::AwaitingEvidence => "awaiting_evidence",
            Self::Complete => "complete",
            Self::Skipped => "skipped",
            Self::Overdue => "overdue",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_started" | "notstarted" => Some(Self::NotStarted),
            "ready" => Some(Self::Ready),
            "blocked" => Some(Self::Blocked),
            "in_progress" | "inprogress" => Some(Self::InProgress),
            "awaiting_evidence" | "awaitingevidence" => Some(Self::AwaitingEvidence),
            "complete" | "completed" => Some(Self::Complete),
            "skipped" => Some(Self::Skipped),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Terminal steps are never transitioned again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skipped)
    }

    /// Whether a predecessor in this status satisfies its dependents.
    pub fn satisfies_dependents(&self) -> bool {
        self.is_terminal()
    }

    pub const ALL: [Self; 8] = [
        Self::NotStarted,
        Self::Ready,
        Self::Blocked,
        Self::InProgress,
        Self::AwaitingEvidence,
        Self::Complete,
        Self::Skipped,
        Self::Overdue,
    ];
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReasonCode {
    /// One or more predecessors are not complete
    DependenciesIncomplete,
    /// An operator pinned the step to Blocked
    ManualOverride,
    AwaitingDocuments,
    AwaitingThirdParty,
    Other,
}

impl BlockedReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependenciesIncomplete => "dependencies_incomplete",
            Self::ManualOverride => "manual_override",
            Self::AwaitingDocuments => "awaiting_documents",
            Self::AwaitingThirdParty => "awaiting_third_party",
            Self::Other => "other",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dependencies_incomplete" => Some(Self::DependenciesIncomplete),
            "manual_override" => Some(Self::ManualOverride),
            "awaiting_documents" => Some(Self::AwaitingDocuments),
            "awaiting_third_party" => Some(Self::AwaitingThirdParty),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Where a step's due date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeadlineSource {
    /// Offset from the plan generation date
    PlanDefault,
}

impl DeadlineSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanDefault => "plan-default",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plan-default" => Some(Self::PlanDefault),
            _ => None,
        }
    }
}

/// One concrete step instance in a case's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: Uuid,
    pub case_id: Uuid,
    pub tenant_id: Uuid,
    /// Stable catalog key, unique within a case
    pub step_key: String,
    pub title: String,
    /// 1-based generation order
    pub sequence: u32,
    pub status: StepStatus,
    pub assigned_user_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub deadline_source: Option<DeadlineSource>,
    /// When true the readiness evaluator never touches this step
    pub is_readiness_overridden: bool,
    pub readiness_override_rationale: Option<String>,
    pub readiness_override_by_user_id: Option<Uuid>,
    pub readiness_overridden_at: Option<DateTime<Utc>>,
    pub blocked_reason_code: Option<BlockedReasonCode>,
    pub blocked_reason_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Row token for optimistic concurrency
    pub version: u64,
}

impl WorkflowStep {
    /// Create a step in `NotStarted` status.
    pub fn new(
        case_id: Uuid,
        tenant_id: Uuid,
        step_key: impl Into<String>,
        title: impl Into<String>,
        sequence: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            case_id,
            tenant_id,
            step_key: step_key.into(),
            title: title.into(),
            sequence,
            status: StepStatus::default(),
            assigned_user_id: None,
            due_date: None,
            deadline_source: None,
            is_readiness_overridden: false,
            readiness_override_rationale: None,
            readiness_override_by_user_id: None,
            readiness_overridden_at: None,
            blocked_reason_code: None,
            blocked_reason_detail: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Set the assigned owner.
    pub fn with_assignee(mut self, user_id: Option<Uuid>) -> Self {
        self.assigned_user_id = user_id;
        self
    }

    /// Set the due date and its source.
    pub fn with_due_date(mut self, due_date: NaiveDate, source: DeadlineSource) -> Self {
        self.due_date = Some(due_date);
        self.deadline_source = Some(source);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `status`, stamping the update time and bumping the row token.
    ///
    /// Legality is checked by the callers; this only records the change.
    pub fn set_status(&mut self, status: StepStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        self.version += 1;
    }

    /// Set status to `Ready` or `Blocked` from dependency state, keeping the
    /// blocked reason fields in step with the status.
    pub fn apply_readiness(&mut self, ready: bool, pending_keys: &[String], now: DateTime<Utc>) {
        if ready {
            self.blocked_reason_code = None;
            self.blocked_reason_detail = None;
            self.set_status(StepStatus::Ready, now);
        } else {
            self.blocked_reason_code = Some(BlockedReasonCode::DependenciesIncomplete);
            self.blocked_reason_detail = Some(format!("waiting on {}", pending_keys.join(", ")));
            self.set_status(StepStatus::Blocked, now);
        }
    }
}

/// Dependency edge: `step_id` depends on `depends_on_step_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepDependency {
    pub case_id: Uuid,
    pub step_id: Uuid,
    pub depends_on_step_id: Uuid,
}

impl StepDependency {
    pub fn new(case_id: Uuid, step_id: Uuid, depends_on_step_id: Uuid) -> Self {
        Self {
            case_id,
            step_id,
            depends_on_step_id,
        }
    }
}
