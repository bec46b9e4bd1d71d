//! CLI command implementations.

pub mod case;
pub mod facts;
pub mod init;
pub mod plan;
pub mod step;
