//! Configuration management
//!
//! Hierarchical configuration using figment:
//! - programmatic defaults
//! - `.caseflow/config.yaml` and `.caseflow/local.yaml`
//! - `CASEFLOW_*` environment overrides
//! - validation of the merged result

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR};
