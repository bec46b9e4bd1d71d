use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::InMemoryCaseRepository;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Participant, Role};
use crate::domain::ports::{CaseRepository, ParticipantResolver};

/// Resolver over a fixed participant list. The case manager, read from the
/// case repository, always resolves to `Manager` at least.
#[derive(Debug)]
pub struct StaticParticipantResolver {
    cases: Arc<InMemoryCaseRepository>,
    participants: Vec<Participant>,
}

impl StaticParticipantResolver {
    pub fn new(cases: Arc<InMemoryCaseRepository>) -> Self {
        Self {
            cases,
            participants: Vec::new(),
        }
    }

    pub fn with_participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = participants;
        self
    }
}

#[async_trait]
impl ParticipantResolver for StaticParticipantResolver {
    async fn accepted_participants(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Vec<Participant>> {
        if self.cases.get(tenant_id, case_id).await?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self
            .participants
            .iter()
            .filter(|p| p.case_id == case_id && p.accepted)
            .cloned()
            .collect())
    }

    async fn effective_role(&self, tenant_id: Uuid, case_id: Uuid, user_id: Uuid) -> DomainResult<Option<Role>> {
        let Some(case) = self.cases.get(tenant_id, case_id).await? else {
            return Ok(None);
        };

        let participant_role = self
            .participants
            .iter()
            .filter(|p| p.case_id == case_id && p.user_id == user_id && p.accepted)
            .map(|p| p.role)
            .max();
        let manager_role = (case.manager_user_id == Some(user_id)).then_some(Role::Manager);

        Ok(participant_role.max(manager_role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Case;

    #[tokio::test]
    async fn test_roles() {
        let cases = Arc::new(InMemoryCaseRepository::new());
        let manager = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let invited = Uuid::new_v4();
        let case = Case::new(Uuid::new_v4(), "SUC-1").with_manager(manager);
        cases.insert(&case).await.unwrap();

        let resolver = StaticParticipantResolver::new(cases).with_participants(vec![
            Participant { case_id: case.id, user_id: editor, role: Role::Editor, accepted: true },
            Participant { case_id: case.id, user_id: invited, role: Role::Admin, accepted: false },
        ]);

        let role = |user| resolver.effective_role(case.tenant_id, case.id, user);
        assert_eq!(role(manager).await.unwrap(), Some(Role::Manager));
        assert_eq!(role(editor).await.unwrap(), Some(Role::Editor));
        assert_eq!(role(invited).await.unwrap(), None);
        assert_eq!(
            resolver.effective_role(Uuid::new_v4(), case.id, manager).await.unwrap(),
            None
        );
        assert_eq!(resolver.accepted_participants(case.tenant_id, case.id).await.unwrap().len(), 1);
    }
}
