use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Participant, Role};

/// Resolves who takes part in a case and in what role.
#[async_trait]
pub trait ParticipantResolver: Send + Sync {
    /// Participants who accepted their invitation to the case.
    async fn accepted_participants(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Vec<Participant>>;

    /// Effective role of a user on a case, `None` when they have no access.
    async fn effective_role(&self, tenant_id: Uuid, case_id: Uuid, user_id: Uuid) -> DomainResult<Option<Role>>;
}
