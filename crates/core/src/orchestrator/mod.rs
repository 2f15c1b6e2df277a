//! Concurrent dispatch of query jobs.
//!
//! The orchestrator fans a batch of jobs out to one worker each, polls every
//! remote query to completion, applies the completeness check, and fans the
//! per-job outcomes back in once every worker has finished.

mod config;
mod dispatcher;
mod types;
mod validator;

pub use config::DispatchConfig;
pub use dispatcher::DispatchOrchestrator;
pub use types::{is_valid_provider_id, JobCandidate, OrchestratorError, Outcome, QueryJob};
pub use validator::{validate_completeness, Completeness};
