//! In-memory implementations of the repository ports.
//!
//! Backed by `tokio::sync::RwLock`; used by tests and when embedding the
//! engine without a database.

mod case_repository;
mod fact_sink;
mod participant_resolver;
mod step_repository;

pub use case_repository::InMemoryCaseRepository;
pub use fact_sink::InMemoryFactSink;
pub use participant_resolver::StaticParticipantResolver;
pub use step_repository::InMemoryStepRepository;
