//! Structured audit and notification facts.
//!
//! The engine describes what happened as [`WorkflowFact`]s and hands them to
//! a fact sink; it never stores them itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation name of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKind {
    #[serde(rename = "workflow.plan_generated")]
    PlanGenerated,
    #[serde(rename = "workflow.ownership_initialized")]
    OwnershipInitialized,
    #[serde(rename = "case.status_changed")]
    CaseStatusChanged,
    #[serde(rename = "workflow.readiness_recalculated")]
    ReadinessRecalculated,
    #[serde(rename = "workflow.readiness_overridden")]
    ReadinessOverridden,
    #[serde(rename = "workflow.task_status_changed")]
    TaskStatusChanged,
    #[serde(rename = "notification.status_changed")]
    StatusChangedNotification,
    #[serde(rename = "notification.missing_input_required")]
    MissingInputRequired,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanGenerated => "workflow.plan_generated",
            Self::OwnershipInitialized => "workflow.ownership_initialized",
            Self::CaseStatusChanged => "case.status_changed",
            Self::ReadinessRecalculated => "workflow.readiness_recalculated",
            Self::ReadinessOverridden => "workflow.readiness_overridden",
            Self::TaskStatusChanged => "workflow.task_status_changed",
            Self::StatusChangedNotification => "notification.status_changed",
            Self::MissingInputRequired => "notification.missing_input_required",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "workflow.plan_generated" => Some(Self::PlanGenerated),
            "workflow.ownership_initialized" => Some(Self::OwnershipInitialized),
            "case.status_changed" => Some(Self::CaseStatusChanged),
            "workflow.readiness_recalculated" => Some(Self::ReadinessRecalculated),
            "workflow.readiness_overridden" => Some(Self::ReadinessOverridden),
            "workflow.task_status_changed" => Some(Self::TaskStatusChanged),
            "notification.status_changed" => Some(Self::StatusChangedNotification),
            "notification.missing_input_required" => Some(Self::MissingInputRequired),
            _ => None,
        }
    }

    /// Notification facts fan out to recipients; the rest are audit only.
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::StatusChangedNotification | Self::MissingInputRequired)
    }
}

/// A single fact emitted by an engine operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFact {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub case_id: Uuid,
    pub kind: FactKind,
    /// User whose request produced the fact
    pub actor_user_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl WorkflowFact {
    pub fn new(tenant_id: Uuid, case_id: Uuid, kind: FactKind, actor_user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            case_id,
            kind,
            actor_user_id,
            occurred_at: Utc::now(),
            payload: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        let kinds = [
            FactKind::PlanGenerated,
            FactKind::OwnershipInitialized,
            FactKind::CaseStatusChanged,
            FactKind::ReadinessRecalculated,
            FactKind::ReadinessOverridden,
            FactKind::TaskStatusChanged,
            FactKind::StatusChangedNotification,
            FactKind::MissingInputRequired,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(FactKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_notification_kinds() {
        assert!(FactKind::MissingInputRequired.is_notification());
        assert!(!FactKind::PlanGenerated.is_notification());
    }
}
