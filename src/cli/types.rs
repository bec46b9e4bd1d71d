//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "caseflow")]
#[command(about = "Caseflow - case workflow plan and readiness engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Tenant the command operates in
    #[arg(long, global = true, env = "CASEFLOW_TENANT")]
    pub tenant: Option<Uuid>,

    /// User performing the command
    #[arg(long, global = true, env = "CASEFLOW_ACTOR")]
    pub actor: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Caseflow configuration and database
    Init(InitArgs),

    /// Case management commands
    #[command(subcommand)]
    Case(CaseCommands),

    /// Workflow plan commands
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Workflow step commands
    #[command(subcommand)]
    Step(StepCommands),

    /// List workflow facts recorded for a case
    Facts(FactsArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(short, long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommands {
    /// Register a new case
    Create {
        /// Human-readable case reference
        reference: String,

        /// Case manager
        #[arg(short, long)]
        manager: Option<Uuid>,

        /// Initial case status
        #[arg(short, long, default_value = "intake")]
        status: String,

        /// Record completed intake answers (otherwise intake stays open)
        #[arg(long)]
        intake: bool,

        /// Intake: the deceased left a will
        #[arg(long, requires = "intake")]
        has_will: bool,

        /// Intake: legal support is required
        #[arg(long, requires = "intake")]
        legal_support: bool,

        /// Intake: financial support is required
        #[arg(long, requires = "intake")]
        financial_support: bool,
    },

    /// Add or update a participant on a case
    AddParticipant {
        /// Case ID
        case_id: Uuid,

        /// Participant user ID
        user_id: Uuid,

        /// Role: viewer, editor, manager, admin
        #[arg(short, long, default_value = "editor")]
        role: String,

        /// Record the invitation as not yet accepted
        #[arg(long)]
        pending: bool,
    },

    /// List cases of the tenant
    List,

    /// Show case details and participants
    Show {
        /// Case ID
        case_id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Generate (or regenerate) the workflow plan from the case intake
    Generate {
        /// Case ID
        case_id: Uuid,
    },

    /// Recompute readiness of every open step
    Recalculate {
        /// Case ID
        case_id: Uuid,
    },

    /// Show the plan in sequence order with dependency depth
    Show {
        /// Case ID
        case_id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum StepCommands {
    /// List steps ranked for the task workspace
    List {
        /// Case ID
        case_id: Uuid,

        /// Reference date for urgency (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
    },

    /// Move a step: STARTED, COMPLETED or NEEDSREVIEW
    Status {
        /// Case ID
        case_id: Uuid,

        /// Step ID or step key
        step: String,

        /// Status token
        token: String,

        /// Note attached to the notification
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Pin a step to ready or blocked regardless of its predecessors
    Override {
        /// Case ID
        case_id: Uuid,

        /// Step ID or step key
        step: String,

        /// Target: ready or blocked
        target: String,

        /// Why the override is needed
        #[arg(short, long)]
        rationale: String,
    },
}

#[derive(Args, Debug)]
pub struct FactsArgs {
    /// Case ID
    pub case_id: Uuid,

    /// Only facts of this kind (e.g. workflow.task_status_changed)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Maximum number of facts to display
    #[arg(short, long, default_value = "50")]
    pub limit: usize,
}
