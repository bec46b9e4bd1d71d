//! `caseflow facts`: audit and notification facts of a case.

use anyhow::{anyhow, Result};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::{base_table, output, short_id, truncate, CommandOutput};
use crate::cli::types::FactsArgs;
use crate::domain::models::{FactKind, WorkflowFact};
use crate::domain::ports::{FactFilter, FactSink};

pub async fn execute(args: FactsArgs, ctx: &CliContext, json: bool) -> Result<()> {
    let tenant_id = ctx.tenant()?;
    ctx.service.get_case(tenant_id, args.case_id).await?;

    let mut filter = FactFilter::new()
        .with_case(tenant_id, args.case_id)
        .with_limit(args.limit);
    if let Some(kind) = args.kind.as_deref() {
        let kind = FactKind::from_str(kind).ok_or_else(|| anyhow!("Unknown fact kind '{kind}'"))?;
        filter = filter.with_kind(kind);
    }

    let facts = ctx.facts.query(filter).await?;
    output(&FactList { facts }, json);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct FactList {
    pub facts: Vec<WorkflowFact>,
}

impl CommandOutput for FactList {
    fn to_human(&self) -> String {
        if self.facts.is_empty() {
            return "No facts found.".to_string();
        }

        let mut table = base_table(&["Occurred At", "Kind", "Actor", "Payload"]);
        for fact in &self.facts {
            table.add_row(vec![
                Cell::new(fact.occurred_at.format("%Y-%m-%d %H:%M:%S")),
                Cell::new(fact.kind.as_str()),
                Cell::new(short_id(&fact.actor_user_id)),
                Cell::new(truncate(&fact.payload.to_string(), 60)),
            ]);
        }
        format!("{table}\n\nShowing {} fact(s)", self.facts.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.facts).unwrap_or_default()
    }
}
