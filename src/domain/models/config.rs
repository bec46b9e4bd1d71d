use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Caseflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plan generation settings
    #[serde(default)]
    pub plan: PlanConfig,

    /// Task workspace ranking windows
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".caseflow/caseflow.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Due-date offsets applied at plan generation.
///
/// A step with sequence `n` is due `due_base_days + due_days_per_step * n`
/// days after the plan was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanConfig {
    #[serde(default = "default_due_base_days")]
    pub due_base_days: i64,

    #[serde(default = "default_due_days_per_step")]
    pub due_days_per_step: i64,
}

const fn default_due_base_days() -> i64 {
    2
}

const fn default_due_days_per_step() -> i64 {
    2
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            due_base_days: default_due_base_days(),
            due_days_per_step: default_due_days_per_step(),
        }
    }
}

/// Urgency windows used by the task workspace ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkspaceConfig {
    /// Steps due within this many days are `due-soon`
    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: i64,

    /// Steps due within this many days are `upcoming`
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: i64,
}

const fn default_due_soon_days() -> i64 {
    2
}

const fn default_upcoming_days() -> i64 {
    7
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            due_soon_days: default_due_soon_days(),
            upcoming_days: default_upcoming_days(),
        }
    }
}
