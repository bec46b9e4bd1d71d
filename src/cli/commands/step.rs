//! `caseflow step` commands.

use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::CliContext;
use crate::cli::output::{base_table, or_dash, output, short_id, status_cell, truncate, urgency_cell, CommandOutput};
use crate::cli::types::StepCommands;
use crate::domain::models::{Role, StepStatus, WorkflowStep};
use crate::services::{today_utc, StatusUpdate, WorkspaceItem};

pub async fn execute(command: StepCommands, ctx: &CliContext, json: bool) -> Result<()> {
    match command {
        StepCommands::List { case_id, today } => {
            let today = today.unwrap_or_else(today_utc);
            let items = ctx.service.task_workspace(ctx.tenant()?, case_id, today).await?;
            output(&WorkspaceView { items }, json);
        }

        StepCommands::Status {
            case_id,
            step,
            token,
            note,
        } => {
            let op = ctx.authorize(case_id, Role::Editor).await?;
            let step_id = ctx.resolve_step(case_id, &step).await?;
            let update = ctx
                .service
                .update_task_status(op, step_id, &token, note.as_deref(), &ctx.cancel)
                .await
                .context("Failed to update step status")?;
            output(&StatusOutput::from(update), json);
        }

        StepCommands::Override {
            case_id,
            step,
            target,
            rationale,
        } => {
            let op = ctx.authorize(case_id, Role::Manager).await?;
            let step_id = ctx.resolve_step(case_id, &step).await?;
            let step = ctx
                .service
                .override_readiness(op, step_id, &target, &rationale, &ctx.cancel)
                .await
                .context("Failed to override readiness")?;
            output(&OverrideOutput { step }, json);
        }
    }

    Ok(())
}

/// Ranked task workspace.
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    pub items: Vec<WorkspaceItem>,
}

impl CommandOutput for WorkspaceView {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No steps found.".to_string();
        }

        let mut table = base_table(&["ID", "Key", "Title", "Status", "Urgency", "Due", "Blocked By"]);
        for item in &self.items {
            let step = &item.step;
            table.add_row(vec![
                Cell::new(short_id(&step.id)),
                Cell::new(&step.step_key),
                Cell::new(truncate(&step.title, 40)),
                status_cell(step.status),
                urgency_cell(item.urgency),
                Cell::new(or_dash(step.due_date)),
                Cell::new(or_dash(step.blocked_reason_detail.as_deref().map(|d| truncate(d, 30)))),
            ]);
        }
        format!("{table}\n\nShowing {} step(s)", self.items.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.items).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub step_id: Uuid,
    pub step_key: String,
    pub previous: StepStatus,
    pub status: StepStatus,
    pub changed: bool,
    pub unblocked: Vec<String>,
}

impl From<StatusUpdate> for StatusOutput {
    fn from(update: StatusUpdate) -> Self {
        Self {
            step_id: update.step.id,
            step_key: update.step.step_key,
            previous: update.previous,
            status: update.step.status,
            changed: update.changed,
            unblocked: update.unblocked,
        }
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if !self.changed {
            return format!("Step {} is already {}; nothing to do.", self.step_key, self.status);
        }
        let mut lines = vec![format!("Step {}: {} -> {}", self.step_key, self.previous, self.status)];
        if !self.unblocked.is_empty() {
            lines.push(format!("Now ready: {}", self.unblocked.join(", ")));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct OverrideOutput {
    pub step: WorkflowStep,
}

impl CommandOutput for OverrideOutput {
    fn to_human(&self) -> String {
        let step = &self.step;
        format!(
            "Step {} pinned to {}\n  Rationale: {}",
            step.step_key,
            step.status,
            step.readiness_override_rationale.as_deref().unwrap_or_default()
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.step).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_output_messages() {
        let mut step = WorkflowStep::new(Uuid::nil(), Uuid::nil(), "validate-will", "Validate will", 4);
        step.status = StepStatus::InProgress;
        let update = StatusUpdate {
            step,
            previous: StepStatus::Ready,
            changed: true,
            unblocked: vec![],
        };
        let out = StatusOutput::from(update);
        assert_eq!(out.to_human(), "Step validate-will: ready -> in_progress");

        let json = out.to_json();
        assert_eq!(json["step_key"], "validate-will");
        assert_eq!(json["previous"], "ready");
    }
}
