//! Intake Orchestrator: per-session state machine, the in-memory session
//! store, and the service that drives extraction and submission.

pub mod handlers;
pub mod orchestrator;
pub mod session;
pub mod store;

pub use orchestrator::IntakeOrchestrator;
