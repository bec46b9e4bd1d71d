use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local directory holding config and the default database.
pub const CONFIG_DIR: &str = ".caseflow";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid plan offset {field}: {value}. Cannot be negative")]
    NegativePlanOffset { field: &'static str, value: i64 },

    #[error("Invalid workspace windows: due_soon_days ({0}) must be between 0 and upcoming_days ({1})")]
    InvalidWorkspaceWindows(i64, i64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .caseflow/config.yaml (project config, created by init)
    /// 3. .caseflow/local.yaml (local overrides, optional)
    /// 4. Environment variables (CASEFLOW_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration rooted at `project_dir`.
    pub fn load_from(project_dir: &Path) -> Result<Config> {
        let config_dir = project_dir.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed("CASEFLOW_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.plan.due_base_days < 0 {
            return Err(ConfigError::NegativePlanOffset {
                field: "due_base_days",
                value: config.plan.due_base_days,
            });
        }
        if config.plan.due_days_per_step < 0 {
            return Err(ConfigError::NegativePlanOffset {
                field: "due_days_per_step",
                value: config.plan.due_days_per_step,
            });
        }

        let workspace = &config.workspace;
        if workspace.due_soon_days < 0 || workspace.due_soon_days > workspace.upcoming_days {
            return Err(ConfigError::InvalidWorkspaceWindows(
                workspace.due_soon_days,
                workspace.upcoming_days,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".caseflow/caseflow.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.plan.due_base_days, 2);
        assert_eq!(config.plan.due_days_per_step, 2);
        assert_eq!(config.workspace.due_soon_days, 2);
        assert_eq!(config.workspace.upcoming_days, 7);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /srv/caseflow/cases.db
  max_connections: 8
logging:
  level: debug
  format: json
plan:
  due_base_days: 5
workspace:
  upcoming_days: 14
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/srv/caseflow/cases.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.plan.due_base_days, 5);
        assert_eq!(config.plan.due_days_per_step, 2);
        assert_eq!(config.workspace.upcoming_days, 14);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_database() {
        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::EmptyDatabasePath)));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_validate_negative_plan_offset() {
        let mut config = Config::default();
        config.plan.due_days_per_step = -1;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::NegativePlanOffset { field: "due_days_per_step", value: -1 })
        ));
    }

    #[test]
    fn test_validate_workspace_windows() {
        let mut config = Config::default();
        config.workspace.due_soon_days = 10;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWorkspaceWindows(10, 7))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.yaml"),
            "logging:\n  level: info\n  format: json\nplan:\n  due_base_days: 3\n",
        )
        .unwrap();
        fs::write(config_dir.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        let config = temp_env::with_vars_unset(
            ["CASEFLOW_LOGGING__LEVEL", "CASEFLOW_PLAN__DUE_BASE_DAYS"],
            || ConfigLoader::load_from(dir.path()),
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug", "local.yaml should win");
        assert_eq!(config.logging.format, "json", "base value should persist");
        assert_eq!(config.plan.due_base_days, 3);
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();

        let config = temp_env::with_vars(
            [
                ("CASEFLOW_PLAN__DUE_DAYS_PER_STEP", Some("4")),
                ("CASEFLOW_WORKSPACE__UPCOMING_DAYS", Some("10")),
                ("CASEFLOW_LOGGING__FORMAT", Some("json")),
            ],
            || ConfigLoader::load_from(dir.path()),
        )
        .unwrap();

        assert_eq!(config.plan.due_days_per_step, 4);
        assert_eq!(config.workspace.upcoming_days, 10);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let result = temp_env::with_var("CASEFLOW_DATABASE__MAX_CONNECTIONS", Some("0"), || {
            ConfigLoader::load_from(dir.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caseflow.yaml");
        fs::write(&path, "workspace:\n  due_soon_days: 1\n  upcoming_days: 3\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.workspace.due_soon_days, 1);
        assert_eq!(config.workspace.upcoming_days, 3);
    }
}
