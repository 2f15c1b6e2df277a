//! Remote analytical queries.
//!
//! This module provides the `QueryService` trait for the remote compute
//! service, a Qubole implementation, the query template, result parsing,
//! and the `QueryRunner` that drives one job from submission to result.

mod qubole;
mod result;
mod runner;
mod service;
mod template;

pub use qubole::{parse_command_status, QuboleClient};
pub use result::{parse_result, QueryResult, ResultParseError, TransactionSummary, NULL_SENTINEL};
pub use runner::{PollPolicy, QueryRunner, RunnerError};
pub use service::{JobHandle, JobStatus, QueryService, QueryServiceError};
pub use template::transaction_summary_query;
