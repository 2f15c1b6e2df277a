//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of every collaborator trait,
//! so a full crawl can run without a tracker, lookup services, a query
//! cluster or a mail relay.
//!
//! # Example
//!
//! ```rust,ignore
//! use datacrawl_core::testing::{fixtures, JobScript, MockQueryService, MockTicketTracker};
//!
//! let tracker = MockTicketTracker::new();
//! tracker.add_ticket("CAM-1", fixtures::ticket_fields(55512, "2024-02-04")).await;
//!
//! let service = MockQueryService::new();
//! service.script("CAM-1", JobScript::done("400\t390\t2023-01-02\t2024-02-05")).await;
//! ```

mod mock_notifier;
mod mock_query_service;
mod mock_resolver;
mod mock_tracker;

pub use mock_notifier::MockNotifier;
pub use mock_query_service::{JobScript, MockQueryService, RecordedSubmission};
pub use mock_resolver::MockProviderResolver;
pub use mock_tracker::{MockTicketTracker, RecordedComment};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{Duration, NaiveDate};

    use crate::orchestrator::QueryJob;
    use crate::query::TransactionSummary;
    use crate::ticket::TicketFields;

    /// Parse a `YYYY-MM-DD` date.
    ///
    /// # Panics
    ///
    /// Panics on a malformed date; fixtures are static test input.
    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap_or_else(|e| panic!("bad fixture date {:?}: {}", s, e))
    }

    /// A query job for study 55512 / provider 9876 with the given post-period end.
    pub fn query_job(key: &str, post_period_end: &str) -> QueryJob {
        let post_period_end = date(post_period_end);
        QueryJob::new(
            key,
            55512,
            "9876",
            post_period_end - Duration::days(398),
            post_period_end,
            "Jane.Doe",
        )
        .unwrap_or_else(|e| panic!("bad fixture job: {}", e))
    }

    /// A transaction summary ending on `latest`.
    pub fn summary(latest: &str) -> TransactionSummary {
        TransactionSummary {
            day_count: 400,
            distinct_transaction_days: 390,
            earliest_date: date("2023-01-02"),
            latest_date: date(latest),
        }
    }

    /// Ticket fields for a study, anchored roughly four months before the post-period end.
    pub fn ticket_fields(study_id: u64, post_period_end: &str) -> TicketFields {
        let post_period_end = date(post_period_end);
        TicketFields {
            study_ref_url: format!("https://studies.example.com/study/view/{}", study_id),
            post_period_end,
            anchor_date: post_period_end - Duration::days(120),
            owner_name: Some("Jane Doe".to_string()),
        }
    }
}
