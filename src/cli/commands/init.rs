//! Implementation of the `caseflow init` command.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::InitArgs;
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nWrote {CONFIG_DIR}/config.yaml"));
        }
        if self.database_initialized {
            lines.push(format!("Database initialized at {CONFIG_DIR}/caseflow.db"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let output_data = initialize(&target_path, args.force).await?;
    output(&output_data, json_mode);
    Ok(())
}

/// Create the project directory layout, default config and database under
/// `target_path`.
pub async fn initialize(target_path: &Path, force: bool) -> Result<InitOutput> {
    let config_dir = target_path.join(CONFIG_DIR);

    if config_dir.exists() && !force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path.to_path_buf(),
            directories_created: vec![],
            config_written: false,
            database_initialized: false,
        });
    }

    if force && config_dir.exists() {
        fs::remove_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to remove existing {CONFIG_DIR} directory"))?;
    }

    let mut directories_created = vec![];
    for dir in [config_dir.clone(), config_dir.join("logs")] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir.strip_prefix(target_path).unwrap_or(&dir).to_string_lossy().to_string();
            directories_created.push(relative);
        }
    }

    let config = Config::default();
    let content = serde_yaml::to_string(&config).context("Failed to serialize default config")?;
    fs::write(config_dir.join("config.yaml"), content)
        .await
        .context("Failed to write config.yaml")?;

    let db_path = config_dir.join("caseflow.db");
    initialize_database(&format!("sqlite:{}", db_path.display()), None)
        .await
        .context("Failed to initialize database")?;

    Ok(InitOutput {
        success: true,
        message: if force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path.to_path_buf(),
        directories_created,
        config_written: true,
        database_initialized: true,
    })
}
