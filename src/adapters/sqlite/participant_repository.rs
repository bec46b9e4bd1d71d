use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Participant, Role};
use crate::domain::ports::ParticipantResolver;

/// Case participants stored next to the cases they belong to.
#[derive(Clone)]
pub struct SqliteParticipantRepository {
    pool: SqlitePool,
}

impl SqliteParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add or update a participant. The case must belong to `tenant_id`.
    pub async fn upsert(&self, tenant_id: Uuid, participant: &Participant) -> DomainResult<()> {
        let result = sqlx::query(
            r#"INSERT INTO case_participants (case_id, user_id, role, accepted, created_at)
               SELECT id, ?, ?, ?, ? FROM cases WHERE id = ? AND tenant_id = ?
               ON CONFLICT(case_id, user_id) DO UPDATE SET role = excluded.role, accepted = excluded.accepted"#,
        )
        .bind(participant.user_id.to_string())
        .bind(participant.role.as_str())
        .bind(participant.accepted)
        .bind(Utc::now().to_rfc3339())
        .bind(participant.case_id.to_string())
        .bind(tenant_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Case", participant.case_id));
        }
        Ok(())
    }

    /// Every participant of a case, accepted or not.
    pub async fn list(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Vec<Participant>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(
            r#"SELECT p.case_id, p.user_id, p.role, p.accepted
               FROM case_participants p JOIN cases c ON c.id = p.case_id
               WHERE p.case_id = ? AND c.tenant_id = ?
               ORDER BY p.created_at, p.user_id"#,
        )
        .bind(case_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Participant::try_from).collect()
    }
}

#[async_trait]
impl ParticipantResolver for SqliteParticipantRepository {
    async fn accepted_participants(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Vec<Participant>> {
        Ok(self
            .list(tenant_id, case_id)
            .await?
            .into_iter()
            .filter(|p| p.accepted)
            .collect())
    }

    async fn effective_role(&self, tenant_id: Uuid, case_id: Uuid, user_id: Uuid) -> DomainResult<Option<Role>> {
        let manager: Option<(Option<String>,)> =
            sqlx::query_as("SELECT manager_user_id FROM cases WHERE id = ? AND tenant_id = ?")
                .bind(case_id.to_string())
                .bind(tenant_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let Some((manager_user_id,)) = manager else {
            return Ok(None);
        };
        let manager_role = (parse_optional_uuid(manager_user_id)? == Some(user_id)).then_some(Role::Manager);

        let participant_role = self
            .accepted_participants(tenant_id, case_id)
            .await?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.role)
            .max();

        Ok(participant_role.max(manager_role))
    }
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    case_id: String,
    user_id: String,
    role: String,
    accepted: bool,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = DomainError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid role: {}", row.role)))?;
        Ok(Participant {
            case_id: parse_uuid(&row.case_id)?,
            user_id: parse_uuid(&row.user_id)?,
            role,
            accepted: row.accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteCaseRepository};
    use crate::domain::models::Case;
    use crate::domain::ports::CaseRepository;

    #[tokio::test]
    async fn test_roles_and_acceptance() {
        let pool = create_migrated_test_pool().await.unwrap();
        let cases = SqliteCaseRepository::new(pool.clone());
        let participants = SqliteParticipantRepository::new(pool);

        let manager = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let case = Case::new(Uuid::new_v4(), "SUC-9").with_manager(manager);
        cases.insert(&case).await.unwrap();

        let add = |user_id, role, accepted| Participant { case_id: case.id, user_id, role, accepted };
        participants.upsert(case.tenant_id, &add(editor, Role::Editor, true)).await.unwrap();
        participants.upsert(case.tenant_id, &add(viewer, Role::Viewer, false)).await.unwrap();

        let role = |user| participants.effective_role(case.tenant_id, case.id, user);
        assert_eq!(role(manager).await.unwrap(), Some(Role::Manager));
        assert_eq!(role(editor).await.unwrap(), Some(Role::Editor));
        assert_eq!(role(viewer).await.unwrap(), None);

        participants.upsert(case.tenant_id, &add(viewer, Role::Viewer, true)).await.unwrap();
        assert_eq!(role(viewer).await.unwrap(), Some(Role::Viewer));
        assert_eq!(participants.accepted_participants(case.tenant_id, case.id).await.unwrap().len(), 2);
        assert_eq!(participants.list(case.tenant_id, case.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_case_rejected() {
        let pool = create_migrated_test_pool().await.unwrap();
        let participants = SqliteParticipantRepository::new(pool);
        let participant = Participant {
            case_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: Role::Editor,
            accepted: true,
        };
        assert!(matches!(
            participants.upsert(Uuid::new_v4(), &participant).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
