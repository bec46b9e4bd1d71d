//! Case, intake and participant models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Draft,
    Intake,
    Active,
    OnHold,
    Closed,
    Archived,
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Intake
    }
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Intake => "intake",
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "intake" => Some(Self::Intake),
            "active" => Some(Self::Active),
            "on_hold" | "onhold" => Some(Self::OnHold),
            "closed" => Some(Self::Closed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Archived)
    }

    /// Statuses that advance to `Active` when a plan is generated.
    pub fn activates_on_plan(&self) -> bool {
        matches!(self, Self::Draft | Self::Intake)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A succession case, as read from the case store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reference: String,
    pub status: CaseStatus,
    pub manager_user_id: Option<Uuid>,
    /// Raw structured-intake answers (JSON object), `None` until intake is done
    pub intake_snapshot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn new(tenant_id: Uuid, reference: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            reference: reference.into(),
            status: CaseStatus::default(),
            manager_user_id: None,
            intake_snapshot: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_manager(mut self, user_id: Uuid) -> Self {
        self.manager_user_id = Some(user_id);
        self
    }

    /// Record completed intake answers.
    pub fn with_intake(mut self, flags: &IntakeFlags) -> Self {
        self.intake_snapshot = serde_json::to_string(flags).ok();
        self
    }

    pub fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = status;
        self
    }

    /// Parse the intake flags, failing if intake is not completed.
    pub fn intake_flags(&self) -> DomainResult<IntakeFlags> {
        IntakeFlags::from_snapshot(self.intake_snapshot.as_deref())
    }
}

/// Intake answers that shape the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeFlags {
    pub has_will: bool,
    pub requires_legal_support: bool,
    pub requires_financial_support: bool,
}

impl IntakeFlags {
    pub fn new(has_will: bool, requires_legal_support: bool, requires_financial_support: bool) -> Self {
        Self {
            has_will,
            requires_legal_support,
            requires_financial_support,
        }
    }

    /// Parse a raw snapshot. Absent, blank or non-object snapshots mean
    /// intake has not been completed.
    pub fn from_snapshot(snapshot: Option<&str>) -> DomainResult<Self> {
        let raw = snapshot.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(intake_not_completed());
        }

        let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| intake_not_completed())?;
        match value {
            serde_json::Value::Object(ref map) if !map.is_empty() => {
                serde_json::from_value(value).map_err(|_| intake_not_completed())
            }
            _ => Err(intake_not_completed()),
        }
    }
}

fn intake_not_completed() -> DomainError {
    DomainError::InvalidCaseState("intake not completed".to_string())
}

/// Role of a user on a case, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer = 1,
    Editor = 2,
    Manager = 3,
    Admin = 4,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "editor" => Some(Self::Editor),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn at_least(&self, minimum: Self) -> bool {
        *self >= minimum
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user invited onto a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    /// Only accepted participants receive notifications
    pub accepted: bool,
}
