//! `caseflow plan` commands.

use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::cli::context::CliContext;
use crate::cli::output::{base_table, or_dash, output, status_cell, truncate, CommandOutput};
use crate::cli::types::PlanCommands;
use crate::domain::models::{CasePlan, Role, StepStatus, WorkflowStep};
use crate::services::DependencyResolver;

pub async fn execute(command: PlanCommands, ctx: &CliContext, json: bool) -> Result<()> {
    match command {
        PlanCommands::Generate { case_id } => {
            let op = ctx.authorize(case_id, Role::Manager).await?;
            let plan = ctx
                .service
                .generate_plan(op, &ctx.cancel)
                .await
                .context("Failed to generate workflow plan")?;
            output(&PlanView::new(&plan)?, json);
        }

        PlanCommands::Recalculate { case_id } => {
            let op = ctx.authorize(case_id, Role::Manager).await?;
            let changed_step_keys = ctx
                .service
                .recalculate_readiness(op, &ctx.cancel)
                .await
                .context("Failed to recalculate readiness")?;
            output(&RecalculateOutput { case_id, changed_step_keys }, json);
        }

        PlanCommands::Show { case_id } => {
            let plan = ctx.service.plan(ctx.tenant()?, case_id).await?;
            output(&PlanView::new(&plan)?, json);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PlannedStep {
    #[serde(flatten)]
    pub step: WorkflowStep,
    pub depth: usize,
    pub depends_on: Vec<String>,
}

/// Steps in sequence order with their depth in the dependency graph.
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub case_id: Uuid,
    pub steps: Vec<PlannedStep>,
}

impl PlanView {
    pub fn new(plan: &CasePlan) -> Result<Self> {
        let depths = DependencyResolver::new().calculate_depths(plan)?;
        let keys: HashMap<Uuid, &str> = plan.steps.iter().map(|s| (s.id, s.step_key.as_str())).collect();

        let steps = plan
            .steps
            .iter()
            .map(|step| PlannedStep {
                depth: depths.get(&step.id).copied().unwrap_or_default(),
                depends_on: plan
                    .dependencies_of(step.id)
                    .iter()
                    .filter_map(|id| keys.get(id).map(|k| (*k).to_string()))
                    .collect(),
                step: step.clone(),
            })
            .collect();

        Ok(Self {
            case_id: plan.case_id,
            steps,
        })
    }
}

impl CommandOutput for PlanView {
    fn to_human(&self) -> String {
        if self.steps.is_empty() {
            return format!("No workflow plan for case {}. Use 'caseflow plan generate'.", self.case_id);
        }

        let mut table = base_table(&["#", "Key", "Title", "Status", "Depth", "Depends On", "Due"]);
        for planned in &self.steps {
            let step = &planned.step;
            let key = if step.is_readiness_overridden {
                format!("{} (override)", step.step_key)
            } else {
                step.step_key.clone()
            };
            table.add_row(vec![
                Cell::new(step.sequence),
                Cell::new(key),
                Cell::new(truncate(&step.title, 40)),
                status_cell(step.status),
                Cell::new(planned.depth),
                Cell::new(if planned.depends_on.is_empty() {
                    "-".to_string()
                } else {
                    planned.depends_on.join(", ")
                }),
                Cell::new(or_dash(step.due_date)),
            ]);
        }

        let ready = self.steps.iter().filter(|p| p.step.status == StepStatus::Ready).count();
        format!("{table}\n\n{} step(s), {ready} ready", self.steps.len())
    }
}

#[derive(Debug, Serialize)]
pub struct RecalculateOutput {
    pub case_id: Uuid,
    pub changed_step_keys: Vec<String>,
}

impl CommandOutput for RecalculateOutput {
    fn to_human(&self) -> String {
        if self.changed_step_keys.is_empty() {
            return "Readiness is up to date; no steps changed.".to_string();
        }
        let mut lines = vec![format!("Readiness changed for {} step(s):", self.changed_step_keys.len())];
        lines.extend(self.changed_step_keys.iter().map(|k| format!("  - {k}")));
        lines.join("\n")
    }
}
