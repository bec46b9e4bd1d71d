//! Caseflow CLI entry point.

use anyhow::Result;
use clap::Parser;

use caseflow::cli::{commands, handle_error, Cli, CliContext, Commands};
use caseflow::infrastructure::config::ConfigLoader;
use caseflow::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load()?;
    let _logger = LoggerImpl::init(&config.logging)?;

    if let Commands::Init(args) = cli.command {
        return commands::init::execute(args, cli.json).await;
    }

    let ctx = CliContext::open(&config, cli.tenant, cli.actor).await?;

    // Abandon the in-flight operation before its first write on Ctrl-C.
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Case(command) => commands::case::execute(command, &ctx, cli.json).await,
        Commands::Plan(command) => commands::plan::execute(command, &ctx, cli.json).await,
        Commands::Step(command) => commands::step::execute(command, &ctx, cli.json).await,
        Commands::Facts(args) => commands::facts::execute(args, &ctx, cli.json).await,
        Commands::Init(_) => Ok(()),
    }
}
