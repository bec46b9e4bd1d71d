//! Domain layer for the Caseflow workflow engine
//!
//! This module contains the case, step and fact models, the error taxonomy
//! and the port traits the engine consumes.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
