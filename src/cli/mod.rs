//! Operator command line.
//!
//! Runs the workflow engine over the SQLite adapters. The CLI authorises the
//! acting user against the case before invoking any mutating operation.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::CliContext;
pub use types::{Cli, Commands};

use crate::domain::errors::DomainError;

/// Exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DomainError>() {
        Some(DomainError::NotFound { .. }) => 4,
        Some(e) if e.is_conflict() => 3,
        Some(DomainError::ValidationFailed(_)) => 2,
        _ => 1,
    }
}

/// Print `err` (as JSON in json mode) and exit with its status.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "conflict": exit_code(&err) == 3,
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(exit_code(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let not_found: anyhow::Error = DomainError::not_found("Case", "x").into();
        assert_eq!(exit_code(&not_found), 4);

        let conflict = Err::<(), _>(DomainError::InvalidCaseState("intake not completed".into()))
            .context("Failed to generate workflow plan")
            .unwrap_err();
        assert_eq!(exit_code(&conflict), 3);

        let invalid: anyhow::Error = DomainError::ValidationFailed("blank".into()).into();
        assert_eq!(exit_code(&invalid), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }
}
