//! Remote query service abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to the query service.
#[derive(Debug, Error)]
pub enum QueryServiceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The service refused to launch the command.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// Lifecycle state of a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    /// Returns the string representation for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether the command has stopped running.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Submitted => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Failed => 2,
        }
    }

    /// Advance to `next`, never moving backwards or out of a terminal state.
    pub fn advance(self, next: JobStatus) -> JobStatus {
        if self.is_terminal() || next.rank() < self.rank() {
            self
        } else {
            next
        }
    }
}

/// Handle to one submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Remote command id.
    pub id: String,
    /// Last observed status.
    pub status: JobStatus,
}

impl JobHandle {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }
}

/// Remote compute service that runs analytical queries.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Launch a query on the cluster identified by `label`.
    async fn submit(
        &self,
        query_text: &str,
        label: &str,
        job_name: &str,
    ) -> Result<JobHandle, QueryServiceError>;

    /// Current status of a submitted command.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, QueryServiceError>;

    /// Raw tabular output of a finished command.
    async fn fetch(&self, handle: &JobHandle) -> Result<String, QueryServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_advance_is_monotonic() {
        assert_eq!(
            JobStatus::Submitted.advance(JobStatus::Running),
            JobStatus::Running
        );
        assert_eq!(
            JobStatus::Running.advance(JobStatus::Submitted),
            JobStatus::Running
        );
        assert_eq!(JobStatus::Running.advance(JobStatus::Done), JobStatus::Done);
        assert_eq!(JobStatus::Done.advance(JobStatus::Failed), JobStatus::Done);
        assert_eq!(JobStatus::Failed.advance(JobStatus::Running), JobStatus::Failed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
