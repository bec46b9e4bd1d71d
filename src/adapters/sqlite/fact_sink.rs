use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FactKind, WorkflowFact};
use crate::domain::ports::{FactFilter, FactSink};

/// Append-only fact log. Timestamps are stored at fixed microsecond width so
/// they order lexically.
#[derive(Clone)]
pub struct SqliteFactSink {
    pool: SqlitePool,
}

impl SqliteFactSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Append one fact inside the caller's transaction.
pub(super) async fn insert_fact(tx: &mut Transaction<'_, Sqlite>, fact: &WorkflowFact) -> DomainResult<()> {
    sqlx::query(
        r#"INSERT INTO workflow_facts (id, tenant_id, case_id, kind, actor_user_id, occurred_at, payload)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(fact.id.to_string())
    .bind(fact.tenant_id.to_string())
    .bind(fact.case_id.to_string())
    .bind(fact.kind.as_str())
    .bind(fact.actor_user_id.to_string())
    .bind(fact.occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true))
    .bind(serde_json::to_string(&fact.payload)?)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl FactSink for SqliteFactSink {
    async fn emit(&self, facts: Vec<WorkflowFact>) -> DomainResult<()> {
        if facts.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for fact in &facts {
            insert_fact(&mut tx, fact).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, filter: FactFilter) -> DomainResult<Vec<WorkflowFact>> {
        let mut query = String::from("SELECT * FROM workflow_facts WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(tenant_id) = filter.tenant_id {
            query.push_str(" AND tenant_id = ?");
            bindings.push(tenant_id.to_string());
        }
        if let Some(case_id) = filter.case_id {
            query.push_str(" AND case_id = ?");
            bindings.push(case_id.to_string());
        }
        if let Some(kind) = filter.kind {
            query.push_str(" AND kind = ?");
            bindings.push(kind.as_str().to_string());
        }
        if let Some(since) = filter.since {
            query.push_str(" AND occurred_at >= ?");
            bindings.push(since.to_rfc3339_opts(SecondsFormat::Micros, true));
        }
        query.push_str(" ORDER BY occurred_at ASC, rowid ASC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, FactRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(WorkflowFact::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct FactRow {
    id: String,
    tenant_id: String,
    case_id: String,
    kind: String,
    actor_user_id: String,
    occurred_at: String,
    payload: String,
}

impl TryFrom<FactRow> for WorkflowFact {
    type Error = DomainError;

    fn try_from(row: FactRow) -> Result<Self, Self::Error> {
        let kind = FactKind::from_str(&row.kind)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid fact kind: {}", row.kind)))?;
        Ok(WorkflowFact {
            id: parse_uuid(&row.id)?,
            tenant_id: parse_uuid(&row.tenant_id)?,
            case_id: parse_uuid(&row.case_id)?,
            kind,
            actor_user_id: parse_uuid(&row.actor_user_id)?,
            occurred_at: parse_datetime(&row.occurred_at)?,
            payload: serde_json::from_str(&row.payload)?,
        })
    }
}
