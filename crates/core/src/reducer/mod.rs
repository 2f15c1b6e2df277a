//! Outcome reduction.
//!
//! Applies the side effect each outcome calls for: comment and label on
//! success, an email on a missing identifier, a log line otherwise.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::metrics::OUTCOMES_TOTAL;
use crate::notify::{NotificationRoute, Notifier};
use crate::orchestrator::{JobCandidate, Outcome};
use crate::ticket::TicketSink;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What the reducer did with one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Comment posted and ticket marked processed.
    Reported,
    /// Missing-identifier notification sent.
    Notified,
    /// Nothing to do beyond logging.
    Logged,
    /// The side effect was attempted and failed.
    ActionFailed(String),
}

/// Per-run tally of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tickets_found: usize,
    pub success: usize,
    pub incomplete: usize,
    pub no_identifier: usize,
    pub not_yet_ready: usize,
    pub errors: usize,
    /// Tickets skipped at ingestion because their fields could not be read.
    pub rejected: usize,
    /// Side effects that failed (comment, label or email).
    pub action_failures: usize,
    pub not_yet_ready_keys: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { .. } => self.success += 1,
            Outcome::Incomplete { .. } => self.incomplete += 1,
            Outcome::NoIdentifier { .. } => self.no_identifier += 1,
            Outcome::NotYetReady { ticket } => {
                self.not_yet_ready += 1;
                self.not_yet_ready_keys.push(ticket.key.clone());
            }
            Outcome::Error { .. } => self.errors += 1,
        }
    }
}

/// Turns outcomes into tracker and notification side effects.
pub struct OutcomeReducer {
    sink: Arc<dyn TicketSink>,
    notifier: Arc<dyn Notifier>,
    route: NotificationRoute,
}

impl OutcomeReducer {
    pub fn new(
        sink: Arc<dyn TicketSink>,
        notifier: Arc<dyn Notifier>,
        route: NotificationRoute,
    ) -> Self {
        Self {
            sink,
            notifier,
            route,
        }
    }

    /// Apply one outcome's side effect. Failures are logged, never raised.
    pub async fn reduce(&self, outcome: &Outcome) -> Disposition {
        OUTCOMES_TOTAL.with_label_values(&[outcome.kind()]).inc();

        match outcome {
            Outcome::Success { job, summary } => {
                if let Err(e) = self.sink.comment(job.job_key(), job.owner(), summary).await {
                    error!(ticket = %job.job_key(), error = %e, "Failed to post data comment");
                    return Disposition::ActionFailed(e.to_string());
                }
                if let Err(e) = self.sink.mark_processed(job.job_key()).await {
                    error!(ticket = %job.job_key(), error = %e, "Failed to mark ticket processed");
                    return Disposition::ActionFailed(e.to_string());
                }
                info!(
                    ticket = %job.job_key(),
                    latest_date = %summary.latest_date,
                    "Data complete, ticket updated"
                );
                Disposition::Reported
            }
            Outcome::Incomplete { job, latest_date } => {
                match latest_date {
                    Some(latest) => info!(
                        ticket = %job.job_key(),
                        latest_date = %latest,
                        required = %job.required_boundary(),
                        "Data does not reach the end of the post period yet"
                    ),
                    None => info!(ticket = %job.job_key(), "No transaction data found"),
                }
                Disposition::Logged
            }
            Outcome::NoIdentifier { candidate } => {
                warn!(
                    ticket = %candidate.ticket,
                    study_ref = %candidate.study_ref,
                    "No provider id, query will not be run"
                );
                let notification = self.route.notification(missing_identifier_body(candidate));
                match self.notifier.send(&notification).await {
                    Ok(()) => Disposition::Notified,
                    Err(e) => {
                        error!(
                            ticket = %candidate.ticket,
                            channel = self.notifier.channel_name(),
                            error = %e,
                            "Failed to send missing provider notification"
                        );
                        Disposition::ActionFailed(e.to_string())
                    }
                }
            }
            Outcome::NotYetReady { ticket } => {
                info!(ticket = %ticket, "Post period not over, skipping");
                Disposition::Logged
            }
            Outcome::Error { job, reason } => {
                error!(ticket = %job.job_key(), reason = %reason, "Query job failed");
                Disposition::Logged
            }
        }
    }

    /// Reduce every outcome, one at a time, and tally the run.
    pub async fn reduce_all(&self, outcomes: &[Outcome]) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
            if let Disposition::ActionFailed(_) = self.reduce(outcome).await {
                summary.action_failures += 1;
            }
        }

        if summary.not_yet_ready > 0 {
            info!(
                count = summary.not_yet_ready,
                tickets = ?summary.not_yet_ready_keys,
                "Tickets that have not yet passed their post-period end date"
            );
        }
        summary
    }
}

/// Body of the missing-identifier email.
pub fn missing_identifier_body(candidate: &JobCandidate) -> String {
    let study_number = candidate
        .study_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| candidate.study_ref.clone());

    format!(
        "Retail Analytics,\n\n\
         There appears to be a problem locating the Provider ID. Please find details below:\n\n\
         Ticket: {ticket}\n\n\
         Study Number: {study}\n\n\
         Study Start Date (minus 1 yr): {start}\n\n\
         Study Post-Period End Date (plus 1 day): {end}\n\n\
         Thanks,\n\
         The CI Team",
        ticket = candidate.ticket.key,
        study = study_number,
        start = candidate.range_start.format(DATE_FORMAT),
        end = candidate.range_end.format(DATE_FORMAT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockNotifier, MockTicketTracker};
    use crate::ticket::TicketRef;

    struct Harness {
        tracker: Arc<MockTicketTracker>,
        notifier: Arc<MockNotifier>,
        reducer: OutcomeReducer,
    }

    fn harness() -> Harness {
        let tracker = Arc::new(MockTicketTracker::new());
        let notifier = Arc::new(MockNotifier::new());
        let reducer = OutcomeReducer::new(
            Arc::clone(&tracker) as Arc<dyn TicketSink>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            NotificationRoute {
                to: "ops@example.com".to_string(),
                from: "ci@example.com".to_string(),
                subject: "Missing Provider ID".to_string(),
            },
        );
        Harness {
            tracker,
            notifier,
            reducer,
        }
    }

    fn candidate(study_id: Option<u64>) -> JobCandidate {
        JobCandidate {
            ticket: TicketRef::new("CAM-7"),
            study_ref: "https://studies.example.com/study/view/55512".to_string(),
            study_id,
            range_start: fixtures::date("2023-01-02"),
            range_end: fixtures::date("2024-02-05"),
            owner: "Jane.Doe".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_comments_and_marks() {
        let h = harness();
        h.tracker
            .add_ticket("CAM-1", fixtures::ticket_fields(55512, "2024-02-04"))
            .await;
        let outcome = Outcome::Success {
            job: fixtures::query_job("CAM-1", "2024-02-04"),
            summary: fixtures::summary("2024-02-05"),
        };

        assert_eq!(h.reducer.reduce(&outcome).await, Disposition::Reported);

        let comments = h.tracker.comments().await;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].ticket_key, "CAM-1");
        assert_eq!(comments[0].owner, "Jane.Doe");
        assert_eq!(comments[0].summary, fixtures::summary("2024-02-05"));
        assert!(h.tracker.is_processed("CAM-1").await);
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_success_on_unknown_ticket_fails_without_marking() {
        let h = harness();
        let outcome = Outcome::Success {
            job: fixtures::query_job("CAM-404", "2024-02-04"),
            summary: fixtures::summary("2024-02-05"),
        };

        assert!(matches!(
            h.reducer.reduce(&outcome).await,
            Disposition::ActionFailed(_)
        ));
        assert_eq!(h.tracker.processed_count().await, 0);
    }

    #[tokio::test]
    async fn test_incomplete_and_error_only_log() {
        let h = harness();
        h.tracker
            .add_ticket("CAM-1", fixtures::ticket_fields(55512, "2024-02-04"))
            .await;

        let incomplete = Outcome::Incomplete {
            job: fixtures::query_job("CAM-1", "2024-02-04"),
            latest_date: Some(fixtures::date("2024-02-03")),
        };
        let failed = Outcome::Error {
            job: fixtures::query_job("CAM-1", "2024-02-04"),
            reason: "timed out".to_string(),
        };

        assert_eq!(h.reducer.reduce(&incomplete).await, Disposition::Logged);
        assert_eq!(h.reducer.reduce(&failed).await, Disposition::Logged);
        assert!(h.tracker.comments().await.is_empty());
        assert!(!h.tracker.is_processed("CAM-1").await);
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_identifier_sends_one_notification() {
        let h = harness();
        let outcome = Outcome::NoIdentifier {
            candidate: candidate(Some(55512)),
        };

        assert_eq!(h.reducer.reduce(&outcome).await, Disposition::Notified);

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@example.com");
        assert_eq!(sent[0].subject, "Missing Provider ID");
        assert!(sent[0].body.contains("Ticket: CAM-7"));
        assert!(sent[0].body.contains("Study Number: 55512"));
        assert!(h.tracker.comments().await.is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_is_contained() {
        let h = harness();
        h.notifier.set_fail(Some("relay down")).await;
        let outcome = Outcome::NoIdentifier {
            candidate: candidate(Some(55512)),
        };

        assert_eq!(
            h.reducer.reduce(&outcome).await,
            Disposition::ActionFailed("SMTP delivery failed: relay down".to_string())
        );
    }

    #[tokio::test]
    async fn test_reduce_all_tallies() {
        let h = harness();
        h.tracker
            .add_ticket("CAM-1", fixtures::ticket_fields(55512, "2024-02-04"))
            .await;

        let outcomes = vec![
            Outcome::Success {
                job: fixtures::query_job("CAM-1", "2024-02-04"),
                summary: fixtures::summary("2024-02-05"),
            },
            Outcome::Incomplete {
                job: fixtures::query_job("CAM-2", "2024-02-04"),
                latest_date: None,
            },
            Outcome::NotYetReady {
                ticket: TicketRef::new("CAM-3"),
            },
            Outcome::NotYetReady {
                ticket: TicketRef::new("CAM-4"),
            },
            Outcome::NoIdentifier {
                candidate: candidate(None),
            },
        ];

        let summary = h.reducer.reduce_all(&outcomes).await;
        assert_eq!(summary.success, 1);
        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.not_yet_ready, 2);
        assert_eq!(summary.no_identifier, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.action_failures, 0);
        assert_eq!(summary.not_yet_ready_keys, vec!["CAM-3", "CAM-4"]);
    }

    #[test]
    fn test_missing_identifier_body() {
        let body = missing_identifier_body(&candidate(Some(55512)));
        assert_eq!(
            body,
            "Retail Analytics,\n\n\
             There appears to be a problem locating the Provider ID. Please find details below:\n\n\
             Ticket: CAM-7\n\n\
             Study Number: 55512\n\n\
             Study Start Date (minus 1 yr): 2023-01-02\n\n\
             Study Post-Period End Date (plus 1 day): 2024-02-05\n\n\
             Thanks,\n\
             The CI Team"
        );
    }

    #[test]
    fn test_missing_identifier_body_without_study_id() {
        let body = missing_identifier_body(&candidate(None));
        assert!(body.contains("Study Number: https://studies.example.com/study/view/55512"));
    }
}
