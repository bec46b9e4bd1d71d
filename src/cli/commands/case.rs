//! `caseflow case` commands.

use anyhow::{anyhow, Context, Result};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::{base_table, or_dash, output, short_id, CommandOutput};
use crate::cli::types::CaseCommands;
use crate::domain::models::{Case, CaseStatus, IntakeFlags, Participant, Role};
use crate::domain::ports::CaseRepository;

pub async fn execute(command: CaseCommands, ctx: &CliContext, json: bool) -> Result<()> {
    match command {
        CaseCommands::Create {
            reference,
            manager,
            status,
            intake,
            has_will,
            legal_support,
            financial_support,
        } => {
            let status = CaseStatus::from_str(&status).ok_or_else(|| {
                anyhow!("Invalid case status '{status}'. Must be one of: draft, intake, active, on_hold, closed, archived")
            })?;
            let mut case = Case::new(ctx.tenant()?, reference).with_status(status);
            if let Some(manager) = manager {
                case = case.with_manager(manager);
            }
            if intake {
                case = case.with_intake(&IntakeFlags::new(has_will, legal_support, financial_support));
            }

            ctx.cases.insert(&case).await.context("Failed to create case")?;
            tracing::info!(case_id = %case.id, reference = %case.reference, "Case created");
            output(&CaseView::new(case, vec![]), json);
        }

        CaseCommands::AddParticipant {
            case_id,
            user_id,
            role,
            pending,
        } => {
            let role = Role::from_str(&role)
                .ok_or_else(|| anyhow!("Invalid role '{role}'. Must be one of: viewer, editor, manager, admin"))?;
            let op = ctx.authorize(case_id, Role::Manager).await?;

            let participant = Participant {
                case_id,
                user_id,
                role,
                accepted: !pending,
            };
            ctx.participants
                .upsert(op.tenant_id, &participant)
                .await
                .context("Failed to add participant")?;

            let case = ctx.service.get_case(op.tenant_id, case_id).await?;
            let participants = ctx.participants.list(op.tenant_id, case_id).await?;
            output(&CaseView::new(case, participants), json);
        }

        CaseCommands::List => {
            let cases = ctx.cases.list(ctx.tenant()?).await?;
            output(&CaseList { cases }, json);
        }

        CaseCommands::Show { case_id } => {
            let tenant_id = ctx.tenant()?;
            let case = ctx.service.get_case(tenant_id, case_id).await?;
            let participants = ctx.participants.list(tenant_id, case_id).await?;
            output(&CaseView::new(case, participants), json);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CaseView {
    #[serde(flatten)]
    pub case: Case,
    pub intake: Option<IntakeFlags>,
    pub participants: Vec<Participant>,
}

impl CaseView {
    fn new(case: Case, participants: Vec<Participant>) -> Self {
        Self {
            intake: case.intake_flags().ok(),
            case,
            participants,
        }
    }
}

impl CommandOutput for CaseView {
    fn to_human(&self) -> String {
        let case = &self.case;
        let mut lines = vec![
            "Case Details:".to_string(),
            format!("  ID: {}", case.id),
            format!("  Reference: {}", case.reference),
            format!("  Status: {}", case.status),
            format!("  Manager: {}", or_dash(case.manager_user_id)),
            format!("  Created at: {}", case.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];

        match self.intake {
            Some(flags) => {
                lines.push("  Intake:".to_string());
                lines.push(format!("    Has will: {}", flags.has_will));
                lines.push(format!("    Legal support: {}", flags.requires_legal_support));
                lines.push(format!("    Financial support: {}", flags.requires_financial_support));
            }
            None => lines.push("  Intake: not completed".to_string()),
        }

        if !self.participants.is_empty() {
            let mut table = base_table(&["User", "Role", "Accepted"]);
            for p in &self.participants {
                table.add_row(vec![
                    Cell::new(p.user_id),
                    Cell::new(p.role),
                    Cell::new(if p.accepted { "yes" } else { "pending" }),
                ]);
            }
            lines.push(format!("\nParticipants:\n{table}"));
        }

        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct CaseList {
    pub cases: Vec<Case>,
}

impl CommandOutput for CaseList {
    fn to_human(&self) -> String {
        if self.cases.is_empty() {
            return "No cases found.".to_string();
        }

        let mut table = base_table(&["ID", "Reference", "Status", "Manager", "Intake"]);
        for case in &self.cases {
            table.add_row(vec![
                Cell::new(short_id(&case.id)),
                Cell::new(&case.reference),
                Cell::new(case.status),
                Cell::new(or_dash(case.manager_user_id.as_ref().map(short_id))),
                Cell::new(if case.intake_flags().is_ok() { "done" } else { "open" }),
            ]);
        }
        format!("{table}\n\nShowing {} case(s)", self.cases.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.cases).unwrap_or_default()
    }
}
