use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Case, CaseStatus};

/// Repository port for the case store.
///
/// All lookups are tenant-scoped: a case of another tenant is not found.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Insert a new case.
    async fn insert(&self, case: &Case) -> DomainResult<()>;

    /// Get a case by id within a tenant.
    async fn get(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Option<Case>>;

    /// Set the case status and touch its update timestamp.
    async fn update_status(&self, tenant_id: Uuid, case_id: Uuid, status: CaseStatus) -> DomainResult<()>;
}
