use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{FactKind, WorkflowFact};

/// Filter for querying recorded facts.
#[derive(Debug, Clone, Default)]
pub struct FactFilter {
    pub tenant_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub kind: Option<FactKind>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl FactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, tenant_id: Uuid, case_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self.case_id = Some(case_id);
        self
    }

    pub fn with_kind(mut self, kind: FactKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if a fact matches this filter.
    pub fn matches(&self, fact: &WorkflowFact) -> bool {
        if self.tenant_id.is_some_and(|t| t != fact.tenant_id) {
            return false;
        }
        if self.case_id.is_some_and(|c| c != fact.case_id) {
            return false;
        }
        if self.kind.is_some_and(|k| k != fact.kind) {
            return false;
        }
        if self.since.is_some_and(|s| fact.occurred_at < s) {
            return false;
        }
        true
    }
}

/// Receives the facts produced by engine operations.
#[async_trait]
pub trait FactSink: Send + Sync {
    /// Record facts, in order.
    async fn emit(&self, facts: Vec<WorkflowFact>) -> DomainResult<()>;

    /// Query recorded facts, oldest first.
    async fn query(&self, filter: FactFilter) -> DomainResult<Vec<WorkflowFact>>;
}
