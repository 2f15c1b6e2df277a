//! Types for the dispatch orchestrator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::TransactionSummary;
use crate::ticket::TicketRef;

/// Errors that can occur building orchestration inputs.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Query range ends before it starts.
    #[error("invalid range for {job_key}: {start} is after {end}")]
    InvalidRange {
        job_key: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Range bound falls outside the representable calendar.
    #[error("date out of range for {job_key}")]
    DateOutOfRange { job_key: String },

    /// Provider id is not a plain alphanumeric token.
    #[error("invalid provider id for {job_key}: {resolved_id:?}")]
    InvalidProviderId {
        job_key: String,
        resolved_id: String,
    },
}

/// Provider ids are spliced into query text, so only ASCII alphanumerics pass.
pub fn is_valid_provider_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// One unit of dispatch work: a ticket with a resolved identifier and date range.
///
/// Immutable once built; `range_start <= range_end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryJob {
    job_key: String,
    study_id: u64,
    resolved_id: String,
    range_start: NaiveDate,
    range_end: NaiveDate,
    post_period_end: NaiveDate,
    owner: String,
}

impl QueryJob {
    /// Build a job, rejecting an inverted or unrepresentable date range and
    /// provider ids that are not alphanumeric.
    pub fn new(
        job_key: impl Into<String>,
        study_id: u64,
        resolved_id: impl Into<String>,
        range_start: NaiveDate,
        post_period_end: NaiveDate,
        owner: impl Into<String>,
    ) -> Result<Self, OrchestratorError> {
        let job_key = job_key.into();
        let resolved_id = resolved_id.into();
        if !is_valid_provider_id(&resolved_id) {
            return Err(OrchestratorError::InvalidProviderId {
                job_key,
                resolved_id,
            });
        }
        let Some(range_end) = post_period_end.checked_add_signed(chrono::Duration::days(1)) else {
            return Err(OrchestratorError::DateOutOfRange { job_key });
        };
        if range_start > range_end {
            return Err(OrchestratorError::InvalidRange {
                job_key,
                start: range_start,
                end: range_end,
            });
        }

        Ok(Self {
            job_key,
            study_id,
            resolved_id,
            range_start,
            range_end,
            post_period_end,
            owner: owner.into(),
        })
    }

    /// Ticket key this job belongs to.
    pub fn job_key(&self) -> &str {
        &self.job_key
    }

    pub fn study_id(&self) -> u64 {
        self.study_id
    }

    /// Provider identifier the query filters on.
    pub fn resolved_id(&self) -> &str {
        &self.resolved_id
    }

    /// First day of the query range (anchor date minus the lookback).
    pub fn range_start(&self) -> NaiveDate {
        self.range_start
    }

    /// Last day of the query range (post-period end plus one day).
    pub fn range_end(&self) -> NaiveDate {
        self.range_end
    }

    /// Date the result's latest transaction must reach for the data to be complete.
    pub fn required_boundary(&self) -> NaiveDate {
        self.post_period_end
    }

    /// Tracker handle of the analyst who owns the study.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name the remote command is submitted under.
    pub fn job_name(&self) -> String {
        format!("{}, {}", self.job_key, self.resolved_id)
    }
}

/// A ticket that passed the readiness gate but whose identifier could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCandidate {
    pub ticket: TicketRef,
    /// Study reference as it appears on the ticket.
    pub study_ref: String,
    /// Study id, when the reference contained one.
    pub study_id: Option<u64>,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub owner: String,
}

/// Result of processing one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Data reaches the boundary date; report it on the ticket.
    Success {
        job: QueryJob,
        summary: TransactionSummary,
    },
    /// Query finished but data does not reach the boundary date (or is absent).
    Incomplete {
        job: QueryJob,
        latest_date: Option<NaiveDate>,
    },
    /// The identifier chain came back empty.
    NoIdentifier { candidate: JobCandidate },
    /// The ticket's post period has not ended yet.
    NotYetReady { ticket: TicketRef },
    /// The job failed; `reason` says how.
    Error { job: QueryJob, reason: String },
}

impl Outcome {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Incomplete { .. } => "incomplete",
            Outcome::NoIdentifier { .. } => "no_identifier",
            Outcome::NotYetReady { .. } => "not_yet_ready",
            Outcome::Error { .. } => "error",
        }
    }

    /// Key of the ticket this outcome belongs to.
    pub fn ticket_key(&self) -> &str {
        match self {
            Outcome::Success { job, .. }
            | Outcome::Incomplete { job, .. }
            | Outcome::Error { job, .. } => job.job_key(),
            Outcome::NoIdentifier { candidate } => &candidate.ticket.key,
            Outcome::NotYetReady { ticket } => &ticket.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_query_job_range() {
        let job = QueryJob::new(
            "CAM-1",
            55512,
            "9876",
            date("2023-01-02"),
            date("2024-02-04"),
            "Jane.Doe",
        )
        .unwrap();

        assert_eq!(job.range_start(), date("2023-01-02"));
        assert_eq!(job.range_end(), date("2024-02-05"));
        assert_eq!(job.required_boundary(), date("2024-02-04"));
        assert_eq!(job.job_name(), "CAM-1, 9876");
    }

    #[test]
    fn test_query_job_rejects_inverted_range() {
        let err = QueryJob::new(
            "CAM-2",
            1,
            "9876",
            date("2024-03-01"),
            date("2024-02-04"),
            "owner",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid range for CAM-2: 2024-03-01 is after 2024-02-05"
        );
    }

    #[test]
    fn test_query_job_rejects_end_past_calendar() {
        let err = QueryJob::new("CAM-5", 1, "9876", date("2024-01-01"), NaiveDate::MAX, "o")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::DateOutOfRange { .. }));
        assert_eq!(err.to_string(), "date out of range for CAM-5");
    }

    #[test]
    fn test_query_job_rejects_non_alphanumeric_provider_id() {
        for bad in ["", "9876) OR (1=1", "98 76", "9876;--", "'9876'"] {
            let err = QueryJob::new("CAM-6", 1, bad, date("2023-01-01"), date("2023-06-01"), "o")
                .unwrap_err();
            assert!(matches!(err, OrchestratorError::InvalidProviderId { .. }), "{:?}", bad);
        }
        assert!(is_valid_provider_id("9876"));
        assert!(is_valid_provider_id("AB12"));
    }

    #[test]
    fn test_outcome_kind_and_key() {
        let outcome = Outcome::NotYetReady {
            ticket: TicketRef::new("CAM-3"),
        };
        assert_eq!(outcome.kind(), "not_yet_ready");
        assert_eq!(outcome.ticket_key(), "CAM-3");
    }

    #[test]
    fn test_outcome_serialization() {
        let job = QueryJob::new("CAM-4", 1, "9", date("2023-01-01"), date("2023-06-01"), "o")
            .unwrap();
        let outcome = Outcome::Error {
            job,
            reason: "timed out".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "error");
        assert_eq!(json["reason"], "timed out");
        assert_eq!(json["job"]["job_key"], "CAM-4");
    }
}
