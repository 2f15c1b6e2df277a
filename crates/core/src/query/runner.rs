//! Query runner: submit, poll, fetch and parse one job.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::LAUNCH_ATTEMPTS;
use crate::orchestrator::QueryJob;

use super::result::{parse_result, QueryResult, ResultParseError};
use super::service::{JobHandle, JobStatus, QueryService};
use super::template::transaction_summary_query;

/// Retry and polling limits for a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub poll_interval: Duration,
    pub max_poll_iterations: u32,
    pub max_launch_attempts: u32,
    pub launch_retry_delay: Duration,
}

/// Why a job did not produce a result.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Every submission was rejected by the service.
    #[error("launch failed after {attempts} attempt(s): {reason}")]
    LaunchFailed { attempts: u32, reason: String },

    /// The final submission ran and ended in the failed state.
    #[error("query execution failed after {attempts} attempt(s)")]
    ExecutionFailed { attempts: u32 },

    /// The poll budget ran out before the command finished.
    #[error("command {command_id} timed out after {polls} status checks")]
    TimedOut { command_id: String, polls: u32 },

    #[error("result fetch failed: {0}")]
    Fetch(String),

    #[error("result unreadable: {0}")]
    Parse(#[from] ResultParseError),
}

impl RunnerError {
    /// Short reason recorded on the job's outcome.
    pub fn reason(&self) -> String {
        match self {
            RunnerError::LaunchFailed { .. } => "launch failed".to_string(),
            RunnerError::ExecutionFailed { .. } => "query execution failed".to_string(),
            RunnerError::TimedOut { .. } => "timed out".to_string(),
            other => other.to_string(),
        }
    }
}

/// How one submission attempt ended without a result.
enum AttemptFailure {
    Rejected(String),
    Failed,
}

/// Runs one job's query against the remote service.
///
/// The runner owns each submission's handle for the lifetime of that
/// attempt; nothing it touches is shared with other workers.
pub struct QueryRunner {
    service: Arc<dyn QueryService>,
    cluster_label: String,
    policy: PollPolicy,
}

impl QueryRunner {
    pub fn new(
        service: Arc<dyn QueryService>,
        cluster_label: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            service,
            cluster_label: cluster_label.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Run the job's query to a parsed result.
    ///
    /// Rejected submissions and commands that end failed are re-submitted
    /// from scratch until the attempt budget is spent. The poll budget is
    /// shared by every submission of the job; running out of it is final.
    pub async fn run(&self, job: &QueryJob) -> Result<QueryResult, RunnerError> {
        let query = transaction_summary_query(job.resolved_id(), job.range_start(), job.range_end());
        let job_name = job.job_name();
        let attempts = self.policy.max_launch_attempts.max(1);
        let mut last_failure = AttemptFailure::Failed;
        let mut polls = 0;

        for attempt in 1..=attempts {
            if attempt > 1 && !self.policy.launch_retry_delay.is_zero() {
                tokio::time::sleep(self.policy.launch_retry_delay).await;
            }

            let mut handle = match self
                .service
                .submit(&query, &self.cluster_label, &job_name)
                .await
            {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(
                        ticket = %job.job_key(),
                        attempt,
                        error = %e,
                        "Query submission rejected"
                    );
                    LAUNCH_ATTEMPTS.with_label_values(&["rejected"]).inc();
                    last_failure = AttemptFailure::Rejected(e.to_string());
                    continue;
                }
            };

            debug!(ticket = %job.job_key(), command_id = %handle.id, attempt, "Query submitted");

            match self.watch(&mut handle, &mut polls).await {
                Ok(JobStatus::Done) => {
                    LAUNCH_ATTEMPTS.with_label_values(&["done"]).inc();
                    info!(ticket = %job.job_key(), command_id = %handle.id, "Query finished");
                    return self.collect(&handle).await;
                }
                Ok(_) => {
                    LAUNCH_ATTEMPTS.with_label_values(&["failed"]).inc();
                    warn!(
                        ticket = %job.job_key(),
                        command_id = %handle.id,
                        attempt,
                        "Query execution failed"
                    );
                    last_failure = AttemptFailure::Failed;
                }
                Err(e) => {
                    LAUNCH_ATTEMPTS.with_label_values(&["timed_out"]).inc();
                    return Err(e);
                }
            }
        }

        Err(match last_failure {
            AttemptFailure::Rejected(reason) => RunnerError::LaunchFailed { attempts, reason },
            AttemptFailure::Failed => RunnerError::ExecutionFailed { attempts },
        })
    }

    /// Poll the handle until it reaches a terminal state or the job's poll budget runs out.
    async fn watch(&self, handle: &mut JobHandle, polls: &mut u32) -> Result<JobStatus, RunnerError> {
        loop {
            if handle.status.is_terminal() {
                return Ok(handle.status);
            }
            if *polls >= self.policy.max_poll_iterations {
                warn!(command_id = %handle.id, polls = *polls, "Query poll budget exhausted");
                return Err(RunnerError::TimedOut {
                    command_id: handle.id.clone(),
                    polls: *polls,
                });
            }

            tokio::time::sleep(self.policy.poll_interval).await;
            *polls += 1;

            match self.service.status(handle).await {
                Ok(status) => {
                    let next = handle.status.advance(status);
                    if next != handle.status {
                        debug!(
                            command_id = %handle.id,
                            status = next.as_str(),
                            "Query status changed"
                        );
                    }
                    handle.status = next;
                }
                // Transient; the next poll tries again and still counts against the budget.
                Err(e) => warn!(command_id = %handle.id, error = %e, "Status check failed"),
            }
        }
    }

    async fn collect(&self, handle: &JobHandle) -> Result<QueryResult, RunnerError> {
        let raw = self
            .service
            .fetch(handle)
            .await
            .map_err(|e| RunnerError::Fetch(e.to_string()))?;
        Ok(parse_result(&raw)?)
    }
}
