use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, CaseStatus};
use crate::domain::ports::CaseRepository;

#[derive(Debug, Default)]
pub struct InMemoryCaseRepository {
    pub(super) cases: RwLock<HashMap<Uuid, Case>>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn insert(&self, case: &Case) -> DomainResult<()> {
        let mut cases = self.cases.write().await;
        if cases.contains_key(&case.id) {
            return Err(DomainError::ValidationFailed(format!("case {} already exists", case.id)));
        }
        cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Option<Case>> {
        let cases = self.cases.read().await;
        Ok(cases
            .get(&case_id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_status(&self, tenant_id: Uuid, case_id: Uuid, status: CaseStatus) -> DomainResult<()> {
        let mut cases = self.cases.write().await;
        let case = cases
            .get_mut(&case_id)
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or_else(|| DomainError::not_found("Case", case_id))?;
        case.status = status;
        case.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_tenant_scoped() {
        let repo = InMemoryCaseRepository::new();
        let case = Case::new(Uuid::new_v4(), "SUC-1");
        repo.insert(&case).await.unwrap();

        assert!(repo.get(case.tenant_id, case.id).await.unwrap().is_some());
        assert!(repo.get(Uuid::new_v4(), case.id).await.unwrap().is_none());
        assert!(repo.update_status(Uuid::new_v4(), case.id, CaseStatus::Active).await.is_err());
    }

    #[tokio::test]
    async fn test_update_status() {
        let repo = InMemoryCaseRepository::new();
        let case = Case::new(Uuid::new_v4(), "SUC-2");
        repo.insert(&case).await.unwrap();
        repo.update_status(case.tenant_id, case.id, CaseStatus::OnHold).await.unwrap();
        assert_eq!(repo.get(case.tenant_id, case.id).await.unwrap().unwrap().status, CaseStatus::OnHold);
        assert!(repo.insert(&case).await.is_err());
    }
}
