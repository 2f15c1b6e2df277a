//! Mock query service for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::query::{JobHandle, JobStatus, QueryService, QueryServiceError};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub query_text: String,
    pub label: String,
    pub job_name: String,
}

/// Scripted behavior for one ticket's remote jobs.
///
/// Submissions are consumed in order: first the rejected ones, then the
/// runs that end `FAILED`, then runs that end `DONE` with `payload`.
#[derive(Debug, Clone, Default)]
pub struct JobScript {
    payload: String,
    polls: u32,
    rejected: u32,
    failed_runs: u32,
    never_finishes: bool,
    panics: bool,
}

impl JobScript {
    /// A job that finishes on its first status check with `payload`.
    pub fn done(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// A job that stays running forever.
    pub fn never_finishes() -> Self {
        Self {
            never_finishes: true,
            ..Default::default()
        }
    }

    /// A job whose submission panics.
    pub fn panics() -> Self {
        Self {
            panics: true,
            ..Default::default()
        }
    }

    /// Report `RUNNING` for this many status checks before the terminal state.
    pub fn polls(mut self, polls: u32) -> Self {
        self.polls = polls;
        self
    }

    /// Reject this many submissions before accepting one.
    pub fn rejected(mut self, count: u32) -> Self {
        self.rejected = count;
        self
    }

    /// End this many accepted runs in `FAILED` before one succeeds.
    pub fn failed_runs(mut self, count: u32) -> Self {
        self.failed_runs = count;
        self
    }
}

#[derive(Debug, Default)]
struct KeyState {
    script: JobScript,
    submits: u32,
    status_checks: u32,
}

/// Mock implementation of the QueryService trait.
///
/// Jobs are keyed by ticket key, taken from the job name
/// (`"{ticket_key}, {provider_id}"`), so tests script behavior per ticket.
///
/// # Example
///
/// ```rust,ignore
/// let service = MockQueryService::new();
/// service
///     .script("CAM-1", JobScript::done("400\t390\t2023-01-02\t2024-02-05").rejected(2))
///     .await;
///
/// // ... run the job ...
///
/// assert_eq!(service.submit_calls("CAM-1").await, 3);
/// ```
#[derive(Debug)]
pub struct MockQueryService {
    keys: Arc<RwLock<HashMap<String, KeyState>>>,
    /// Status checks seen per command id.
    command_polls: Arc<RwLock<HashMap<String, u32>>>,
    submissions: Arc<RwLock<Vec<RecordedSubmission>>>,
    submit_delay: Arc<RwLock<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockQueryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQueryService {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            command_polls: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(Vec::new())),
            submit_delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Script the behavior of jobs for a ticket.
    pub async fn script(&self, ticket_key: &str, script: JobScript) {
        self.keys.write().await.insert(
            ticket_key.to_string(),
            KeyState {
                script,
                ..Default::default()
            },
        );
    }

    /// Make every submission take this long.
    pub async fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.write().await = delay;
    }

    /// All recorded submissions, accepted or not.
    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.read().await.clone()
    }

    /// Number of submissions made for a ticket.
    pub async fn submit_calls(&self, ticket_key: &str) -> u32 {
        self.keys
            .read()
            .await
            .get(ticket_key)
            .map(|s| s.submits)
            .unwrap_or(0)
    }

    /// Number of status checks made for a ticket, across all submissions.
    pub async fn status_calls(&self, ticket_key: &str) -> u32 {
        self.keys
            .read()
            .await
            .get(ticket_key)
            .map(|s| s.status_checks)
            .unwrap_or(0)
    }

    /// Highest number of submissions observed in progress at once.
    pub async fn max_in_flight_submissions(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn ticket_key(job_name: &str) -> &str {
        job_name.split(", ").next().unwrap_or(job_name)
    }

    /// Command ids look like `"{ticket_key}#{submission}"`.
    fn parse_command_id(id: &str) -> Option<(&str, u32)> {
        let (key, n) = id.rsplit_once('#')?;
        Some((key, n.parse().ok()?))
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn submit(
        &self,
        query_text: &str,
        label: &str,
        job_name: &str,
    ) -> Result<JobHandle, QueryServiceError> {
        let key = Self::ticket_key(job_name).to_string();
        if self
            .keys
            .read()
            .await
            .get(&key)
            .map(|s| s.script.panics)
            .unwrap_or(false)
        {
            panic!("scripted panic for {}", key);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = *self.submit_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.submissions.write().await.push(RecordedSubmission {
            query_text: query_text.to_string(),
            label: label.to_string(),
            job_name: job_name.to_string(),
        });

        let mut keys = self.keys.write().await;
        let state = keys
            .get_mut(&key)
            .ok_or_else(|| QueryServiceError::Rejected(format!("no script for {}", key)))?;
        state.submits += 1;

        if state.submits <= state.script.rejected {
            return Err(QueryServiceError::Rejected(format!(
                "submission {} rejected",
                state.submits
            )));
        }

        Ok(JobHandle::new(
            format!("{}#{}", key, state.submits),
            JobStatus::Submitted,
        ))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, QueryServiceError> {
        let (key, submission) = Self::parse_command_id(&handle.id)
            .ok_or_else(|| QueryServiceError::NotFound(handle.id.clone()))?;

        let polls = {
            let mut command_polls = self.command_polls.write().await;
            let count = command_polls.entry(handle.id.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let mut keys = self.keys.write().await;
        let state = keys
            .get_mut(key)
            .ok_or_else(|| QueryServiceError::NotFound(handle.id.clone()))?;
        state.status_checks += 1;

        let script = &state.script;
        if script.never_finishes || polls <= script.polls {
            return Ok(JobStatus::Running);
        }

        let run = submission - script.rejected;
        if run <= script.failed_runs {
            Ok(JobStatus::Failed)
        } else {
            Ok(JobStatus::Done)
        }
    }

    async fn fetch(&self, handle: &JobHandle) -> Result<String, QueryServiceError> {
        let (key, _) = Self::parse_command_id(&handle.id)
            .ok_or_else(|| QueryServiceError::NotFound(handle.id.clone()))?;

        self.keys
            .read()
            .await
            .get(key)
            .map(|s| s.script.payload.clone())
            .ok_or_else(|| QueryServiceError::NotFound(handle.id.clone()))
    }
}
