use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, CaseStatus};
use crate::domain::ports::CaseRepository;

#[derive(Clone)]
pub struct SqliteCaseRepository {
    pool: SqlitePool,
}

impl SqliteCaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cases of a tenant, newest first.
    pub async fn list(&self, tenant_id: Uuid) -> DomainResult<Vec<Case>> {
        let rows: Vec<CaseRow> = sqlx::query_as("SELECT * FROM cases WHERE tenant_id = ? ORDER BY created_at DESC")
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Case::try_from).collect()
    }
}

#[async_trait]
impl CaseRepository for SqliteCaseRepository {
    async fn insert(&self, case: &Case) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO cases (id, tenant_id, reference, status, manager_user_id, intake_snapshot, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(case.id.to_string())
        .bind(case.tenant_id.to_string())
        .bind(&case.reference)
        .bind(case.status.as_str())
        .bind(case.manager_user_id.map(|id| id.to_string()))
        .bind(&case.intake_snapshot)
        .bind(case.created_at.to_rfc3339())
        .bind(case.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<Option<Case>> {
        let row: Option<CaseRow> = sqlx::query_as("SELECT * FROM cases WHERE id = ? AND tenant_id = ?")
            .bind(case_id.to_string())
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Case::try_from).transpose()
    }

    async fn update_status(&self, tenant_id: Uuid, case_id: Uuid, status: CaseStatus) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        update_case_status(&mut tx, tenant_id, case_id, status).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Set a case's status inside the caller's transaction.
pub(super) async fn update_case_status(
    tx: &mut Transaction<'_, Sqlite>,
    tenant_id: Uuid,
    case_id: Uuid,
    status: CaseStatus,
) -> DomainResult<()> {
    let result = sqlx::query("UPDATE cases SET status = ?, updated_at = ? WHERE id = ? AND tenant_id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(case_id.to_string())
        .bind(tenant_id.to_string())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found("Case", case_id));
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    tenant_id: String,
    reference: String,
    status: String,
    manager_user_id: Option<String>,
    intake_snapshot: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CaseRow> for Case {
    type Error = DomainError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let status = CaseStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid case status: {}", row.status)))?;

        Ok(Case {
            id: parse_uuid(&row.id)?,
            tenant_id: parse_uuid(&row.tenant_id)?,
            reference: row.reference,
            status,
            manager_user_id: parse_optional_uuid(row.manager_user_id)?,
            intake_snapshot: row.intake_snapshot,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
