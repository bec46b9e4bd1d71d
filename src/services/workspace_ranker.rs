use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::domain::models::{CasePlan, StepStatus, WorkflowStep, WorkspaceConfig};

/// How close a step is to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrgencyIndicator {
    Overdue,
    DueSoon,
    Upcoming,
    None,
}

impl UrgencyIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::DueSoon => "due-soon",
            Self::Upcoming => "upcoming",
            Self::None => "none",
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Overdue => 0,
            Self::DueSoon => 1,
            Self::Upcoming => 2,
            Self::None => 3,
        }
    }
}

/// A step as presented in the task workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceItem {
    pub step: WorkflowStep,
    pub priority_rank: u8,
    pub urgency: UrgencyIndicator,
    pub depends_on: Vec<Uuid>,
}

/// Priority rank of a status; lower is presented first.
pub fn priority_rank(status: StepStatus) -> u8 {
    match status {
        StepStatus::InProgress => 1,
        StepStatus::Ready | StepStatus::Overdue => 2,
        StepStatus::AwaitingEvidence => 3,
        StepStatus::Blocked => 4,
        StepStatus::NotStarted => 5,
        StepStatus::Complete | StepStatus::Skipped => 6,
    }
}

/// Orders a case's steps for operators.
///
/// Sort key: priority rank, urgency rank, due date (undated last), sequence.
/// Read-only; never mutates the plan.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceRanker {
    due_soon_days: i64,
    upcoming_days: i64,
}

impl Default for WorkspaceRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceRanker {
    /// Ranker with the default windows (2 and 7 days)
    pub fn new() -> Self {
        Self::from_config(&WorkspaceConfig::default())
    }

    pub fn with_windows(due_soon_days: i64, upcoming_days: i64) -> Self {
        Self {
            due_soon_days,
            upcoming_days,
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::with_windows(config.due_soon_days, config.upcoming_days)
    }

    pub fn urgency(&self, step: &WorkflowStep, today: NaiveDate) -> UrgencyIndicator {
        let Some(due) = step.due_date else {
            return UrgencyIndicator::None;
        };
        if step.is_terminal() {
            return UrgencyIndicator::None;
        }

        let days_left = (due - today).num_days();
        if days_left < 0 {
            UrgencyIndicator::Overdue
        } else if days_left <= self.due_soon_days {
            UrgencyIndicator::DueSoon
        } else if days_left <= self.upcoming_days {
            UrgencyIndicator::Upcoming
        } else {
            UrgencyIndicator::None
        }
    }

    /// Rank every step of `plan` as of `today`.
    pub fn rank(&self, plan: &CasePlan, today: NaiveDate) -> Vec<WorkspaceItem> {
        let mut items: Vec<WorkspaceItem> = plan
            .steps
            .iter()
            .map(|step| WorkspaceItem {
                priority_rank: priority_rank(step.status),
                urgency: self.urgency(step, today),
                depends_on: plan.dependencies_of(step.id),
                step: step.clone(),
            })
            .collect();

        items.sort_by(compare_items);
        items
    }
}

fn compare_items(a: &WorkspaceItem, b: &WorkspaceItem) -> Ordering {
    a.priority_rank
        .cmp(&b.priority_rank)
        .then(a.urgency.rank().cmp(&b.urgency.rank()))
        .then(compare_due(a.step.due_date, b.step.due_date))
        .then(a.step.sequence.cmp(&b.step.sequence))
}

// Undated steps sort after dated ones.
fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
