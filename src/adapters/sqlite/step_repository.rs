use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::case_repository::update_case_status;
use super::fact_sink::insert_fact;
use super::{parse_datetime, parse_optional_date, parse_optional_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    BlockedReasonCode, CasePlan, DeadlineSource, StepDependency, StepStatus, WorkflowStep,
};
use crate::domain::ports::{PlanCommit, StepRepository};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteStepRepository {
    pool: SqlitePool,
}

impl SqliteStepRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_step(tx: &mut Transaction<'_, Sqlite>, step: &WorkflowStep) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO workflow_steps (
                id, case_id, tenant_id, step_key, title, sequence, status, assigned_user_id,
                due_date, deadline_source, is_readiness_overridden, readiness_override_rationale,
                readiness_override_by_user_id, readiness_overridden_at, blocked_reason_code,
                blocked_reason_detail, version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(step.id.to_string())
        .bind(step.case_id.to_string())
        .bind(step.tenant_id.to_string())
        .bind(&step.step_key)
        .bind(&step.title)
        .bind(i64::from(step.sequence))
        .bind(step.status.as_str())
        .bind(step.assigned_user_id.map(|id| id.to_string()))
        .bind(step.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(step.deadline_source.map(|s| s.as_str()))
        .bind(step.is_readiness_overridden)
        .bind(&step.readiness_override_rationale)
        .bind(step.readiness_override_by_user_id.map(|id| id.to_string()))
        .bind(step.readiness_overridden_at.map(|t| t.to_rfc3339()))
        .bind(step.blocked_reason_code.map(|c| c.as_str()))
        .bind(&step.blocked_reason_detail)
        .bind(step.version as i64)
        .bind(step.created_at.to_rfc3339())
        .bind(step.updated_at.to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn replace_in_tx(tx: &mut Transaction<'_, Sqlite>, plan: &CasePlan) -> DomainResult<()> {
        let case_id = plan.case_id.to_string();

        sqlx::query("DELETE FROM workflow_step_dependencies WHERE case_id = ?")
            .bind(&case_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM workflow_steps WHERE case_id = ? AND tenant_id = ?")
            .bind(&case_id)
            .bind(plan.tenant_id.to_string())
            .execute(&mut **tx)
            .await?;

        for step in &plan.steps {
            Self::insert_step(tx, step).await?;
        }

        for edge in &plan.dependencies {
            sqlx::query("INSERT INTO workflow_step_dependencies (case_id, step_id, depends_on_step_id) VALUES (?, ?, ?)")
                .bind(edge.case_id.to_string())
                .bind(edge.step_id.to_string())
                .bind(edge.depends_on_step_id.to_string())
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Update one step if its stored version is `step.version - 1`.
    async fn update_step(tx: &mut Transaction<'_, Sqlite>, step: &WorkflowStep) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE workflow_steps SET
                status = ?, assigned_user_id = ?, due_date = ?, deadline_source = ?,
                is_readiness_overridden = ?, readiness_override_rationale = ?,
                readiness_override_by_user_id = ?, readiness_overridden_at = ?,
                blocked_reason_code = ?, blocked_reason_detail = ?, version = ?, updated_at = ?
               WHERE id = ? AND tenant_id = ? AND version = ?"#,
        )
        .bind(step.status.as_str())
        .bind(step.assigned_user_id.map(|id| id.to_string()))
        .bind(step.due_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(step.deadline_source.map(|s| s.as_str()))
        .bind(step.is_readiness_overridden)
        .bind(&step.readiness_override_rationale)
        .bind(step.readiness_override_by_user_id.map(|id| id.to_string()))
        .bind(step.readiness_overridden_at.map(|t| t.to_rfc3339()))
        .bind(step.blocked_reason_code.map(|c| c.as_str()))
        .bind(&step.blocked_reason_detail)
        .bind(step.version as i64)
        .bind(step.updated_at.to_rfc3339())
        .bind(step.id.to_string())
        .bind(step.tenant_id.to_string())
        .bind(step.version as i64 - 1)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM workflow_steps WHERE id = ? AND tenant_id = ?")
            .bind(step.id.to_string())
            .bind(step.tenant_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;

        Err(match exists {
            Some(_) => DomainError::ConcurrencyConflict {
                entity: "Step",
                id: step.id.to_string(),
            },
            None => DomainError::not_found("Step", step.id),
        })
    }
}

#[async_trait]
impl StepRepository for SqliteStepRepository {
    async fn load_plan(&self, tenant_id: Uuid, case_id: Uuid) -> DomainResult<CasePlan> {
        let rows: Vec<StepRow> =
            sqlx::query_as("SELECT * FROM workflow_steps WHERE tenant_id = ? AND case_id = ? ORDER BY sequence")
                .bind(tenant_id.to_string())
                .bind(case_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        if rows.is_empty() {
            return Ok(CasePlan::empty(tenant_id, case_id));
        }

        let steps = rows
            .into_iter()
            .map(WorkflowStep::try_from)
            .collect::<DomainResult<Vec<_>>>()?;

        let edges: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT case_id, step_id, depends_on_step_id FROM workflow_step_dependencies WHERE case_id = ? ORDER BY rowid",
        )
        .bind(case_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let dependencies = edges
            .into_iter()
            .map(|(case_id, step_id, depends_on)| {
                Ok(StepDependency::new(
                    parse_uuid(&case_id)?,
                    parse_uuid(&step_id)?,
                    parse_uuid(&depends_on)?,
                ))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(CasePlan::new(tenant_id, case_id, steps, dependencies))
    }

    async fn replace_plan(&self, plan: &CasePlan) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::replace_in_tx(&mut tx, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_steps(&self, steps: &[WorkflowStep]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for step in steps {
            // An error drops `tx`, rolling back earlier updates in the batch.
            Self::update_step(&mut tx, step).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn commit(&self, commit: PlanCommit) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        // Any error below drops `tx` and rolls the whole operation back.
        if let Some(plan) = &commit.replacement {
            Self::replace_in_tx(&mut tx, plan).await?;
        }
        for step in &commit.steps {
            Self::update_step(&mut tx, step).await?;
        }
        if let Some(status) = commit.case_status {
            update_case_status(&mut tx, commit.tenant_id, commit.case_id, status).await?;
        }
        for fact in &commit.facts {
            insert_fact(&mut tx, fact).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    case_id: String,
    tenant_id: String,
    step_key: String,
    title: String,
    sequence: i64,
    status: String,
    assigned_user_id: Option<String>,
    due_date: Option<String>,
    deadline_source: Option<String>,
    is_readiness_overridden: bool,
    readiness_override_rationale: Option<String>,
    readiness_override_by_user_id: Option<String>,
    readiness_overridden_at: Option<String>,
    blocked_reason_code: Option<String>,
    blocked_reason_detail: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<StepRow> for WorkflowStep {
    type Error = DomainError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        let status = StepStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid step status: {}", row.status)))?;

        let deadline_source = row
            .deadline_source
            .map(|s| {
                DeadlineSource::from_str(&s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid deadline source: {s}")))
            })
            .transpose()?;

        let blocked_reason_code = row
            .blocked_reason_code
            .map(|s| {
                BlockedReasonCode::from_str(&s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid blocked reason: {s}")))
            })
            .transpose()?;

        let sequence = u32::try_from(row.sequence)
            .map_err(|_| DomainError::SerializationError(format!("Invalid sequence: {}", row.sequence)))?;

        Ok(WorkflowStep {
            id: parse_uuid(&row.id)?,
            case_id: parse_uuid(&row.case_id)?,
            tenant_id: parse_uuid(&row.tenant_id)?,
            step_key: row.step_key,
            title: row.title,
            sequence,
            status,
            assigned_user_id: parse_optional_uuid(row.assigned_user_id)?,
            due_date: parse_optional_date(row.due_date)?,
            deadline_source,
            is_readiness_overridden: row.is_readiness_overridden,
            readiness_override_rationale: row.readiness_override_rationale,
            readiness_override_by_user_id: parse_optional_uuid(row.readiness_override_by_user_id)?,
            readiness_overridden_at: parse_optional_datetime(row.readiness_overridden_at)?,
            blocked_reason_code,
            blocked_reason_detail: row.blocked_reason_detail,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            version: row.version as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteCaseRepository};
    use crate::domain::models::{Case, CaseStatus, FactKind, IntakeFlags, WorkflowFact};
    use crate::domain::ports::CaseRepository;
    use crate::services::PlanGenerator;
    use chrono::Utc;

    async fn setup() -> (SqliteStepRepository, CasePlan) {
        let pool = create_migrated_test_pool().await.unwrap();
        let cases = SqliteCaseRepository::new(pool.clone());
        let case = Case::new(Uuid::new_v4(), "SUC-7")
            .with_manager(Uuid::new_v4())
            .with_intake(&IntakeFlags::new(true, true, true));
        cases.insert(&case).await.unwrap();

        let generated = PlanGenerator::default()
            .generate(&case, 0, Uuid::new_v4(), Utc::now())
            .unwrap();
        (SqliteStepRepository::new(pool), generated.plan)
    }

    #[tokio::test]
    async fn test_replace_and_load_round_trip() {
        let (repo, plan) = setup().await;
        repo.replace_plan(&plan).await.unwrap();

        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.steps.len(), 6);
        assert_eq!(loaded.dependencies, plan.dependencies);
        for (loaded, original) in loaded.steps.iter().zip(&plan.steps) {
            assert_eq!(loaded.id, original.id);
            assert_eq!(loaded.status, original.status);
            assert_eq!(loaded.due_date, original.due_date);
            assert_eq!(loaded.blocked_reason_code, original.blocked_reason_code);
            assert_eq!(loaded.version, 1);
        }
    }

    #[tokio::test]
    async fn test_replace_discards_previous_plan() {
        let (repo, plan) = setup().await;
        repo.replace_plan(&plan).await.unwrap();

        let mut smaller = plan.clone();
        smaller.steps.truncate(2);
        smaller.dependencies.clear();
        for step in &mut smaller.steps {
            step.id = Uuid::new_v4();
        }
        repo.replace_plan(&smaller).await.unwrap();

        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.steps.len(), 2);
        assert!(loaded.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_stale_version_rolls_back_batch() {
        let (repo, plan) = setup().await;
        repo.replace_plan(&plan).await.unwrap();

        let mut first = plan.steps[0].clone();
        first.set_status(StepStatus::InProgress, Utc::now());
        let mut stale = plan.steps[1].clone();
        stale.version = 7;

        let err = repo.save_steps(&[first.clone(), stale]).await.unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.step(first.id).unwrap().status, plan.steps[0].status);

        repo.save_steps(&[first.clone()]).await.unwrap();
        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.step(first.id).unwrap().status, StepStatus::InProgress);
        assert_eq!(loaded.step(first.id).unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_duplicate_step_key_rejected() {
        let (repo, mut plan) = setup().await;
        plan.steps[1].step_key = plan.steps[0].step_key.clone();
        plan.dependencies.clear();
        assert!(repo.replace_plan(&plan).await.is_err());
    }

    async fn fact_count(repo: &SqliteStepRepository) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workflow_facts")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        count
    }

    fn plan_fact(plan: &CasePlan) -> WorkflowFact {
        WorkflowFact::new(
            plan.tenant_id,
            plan.case_id,
            FactKind::PlanGenerated,
            Uuid::new_v4(),
        )
    }

    #[tokio::test]
    async fn test_commit_writes_every_part() {
        let (repo, plan) = setup().await;
        let commit = PlanCommit::new(plan.tenant_id, plan.case_id)
            .replacing(plan.clone())
            .with_case_status(Some(CaseStatus::Active))
            .with_facts(vec![plan_fact(&plan)]);
        repo.commit(commit).await.unwrap();

        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.steps.len(), 6);
        let cases = SqliteCaseRepository::new(repo.pool.clone());
        let case = cases.get(plan.tenant_id, plan.case_id).await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Active);
        assert_eq!(fact_count(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_unknown_case() {
        let (repo, plan) = setup().await;
        let commit = PlanCommit::new(Uuid::new_v4(), plan.case_id)
            .replacing(plan.clone())
            .with_case_status(Some(CaseStatus::Active))
            .with_facts(vec![plan_fact(&plan)]);

        let err = repo.commit(commit).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap().is_empty());
        assert_eq!(fact_count(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_commit_rolls_back_when_fact_insert_fails() {
        let (repo, plan) = setup().await;
        repo.replace_plan(&plan).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_facts BEFORE INSERT ON workflow_facts BEGIN SELECT RAISE(ABORT, 'fact log unavailable'); END",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let mut step = plan.steps[0].clone();
        step.set_status(StepStatus::InProgress, Utc::now());
        let commit = PlanCommit::new(plan.tenant_id, plan.case_id)
            .with_steps(vec![step.clone()])
            .with_facts(vec![plan_fact(&plan)]);
        assert!(matches!(repo.commit(commit).await, Err(DomainError::DatabaseError(_))));

        let loaded = repo.load_plan(plan.tenant_id, plan.case_id).await.unwrap();
        assert_eq!(loaded.step(step.id).unwrap().status, plan.steps[0].status);
        assert_eq!(loaded.step(step.id).unwrap().version, 1);
    }
}
