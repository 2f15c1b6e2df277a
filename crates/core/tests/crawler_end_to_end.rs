//! End-to-end crawl tests.
//!
//! These tests drive a full run through mock collaborators:
//! search -> ingestion -> dispatch -> completeness -> reduction

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};

use datacrawl_core::{
    load_config_from_str,
    testing::{fixtures, JobScript, MockNotifier, MockProviderResolver, MockQueryService, MockTicketTracker},
    Collaborators, Config, CrawlerError, DataCrawler, NotificationRoute, Notifier,
    ProviderResolver, QueryService, TicketSink, TicketSource,
};

const CONFIG: &str = r#"
[tracker]
url = "https://jira.example.com"
username = "svc"
token = "secret"
issue_type = "Measurement Strategy"

[resolver]
study_url = "https://studies.example.com/api/studies/"
account_url = "https://accounts.example.com/api/accounts/"

[query_service]
url = "https://api.qubole.example.com"
token = "secret"
cluster_label = "analytics"

[dispatch]
poll_interval_ms = 1
max_poll_iterations = 10
max_launch_attempts = 3
launch_retry_delay_ms = 0

[email]
smtp_host = "mailhost.example.com"
from = "ci@example.com"
to = "retail@example.com"
subject = "Retail Data Crawler - missing Provider ID"
"#;

/// Test helper holding every mock collaborator.
struct TestHarness {
    tracker: Arc<MockTicketTracker>,
    resolver: Arc<MockProviderResolver>,
    service: Arc<MockQueryService>,
    notifier: Arc<MockNotifier>,
    config: Config,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            tracker: Arc::new(MockTicketTracker::new()),
            resolver: Arc::new(MockProviderResolver::new()),
            service: Arc::new(MockQueryService::new()),
            notifier: Arc::new(MockNotifier::new()),
            config: load_config_from_str(CONFIG).expect("Failed to parse test config"),
        }
    }

    fn crawler(&self) -> DataCrawler {
        DataCrawler::from_config(
            &self.config,
            Collaborators {
                source: Arc::clone(&self.tracker) as Arc<dyn TicketSource>,
                sink: Arc::clone(&self.tracker) as Arc<dyn TicketSink>,
                resolver: Arc::clone(&self.resolver) as Arc<dyn ProviderResolver>,
                query_service: Arc::clone(&self.service) as Arc<dyn QueryService>,
                notifier: Arc::clone(&self.notifier) as Arc<dyn Notifier>,
            },
        )
    }
}

fn today() -> chrono::NaiveDate {
    fixtures::date("2024-02-10")
}

#[tokio::test]
async fn test_scenario_a_complete_data_is_reported() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-100", fixtures::ticket_fields(55510, "2024-02-04"))
        .await;
    h.resolver.set_chain(55510, "812", "9876").await;
    h.service
        .script("CAM-100", JobScript::done("400\t390\t2023-01-02\t2024-02-05").polls(2))
        .await;

    let summary = assert_ok!(h.crawler().run(today()).await);

    assert_eq!(summary.tickets_found, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.incomplete, 0);

    let comments = h.tracker.comments().await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].ticket_key, "CAM-100");
    assert_eq!(comments[0].owner, "Jane.Doe");
    assert_eq!(comments[0].summary.day_count, 400);
    assert_eq!(comments[0].summary.distinct_transaction_days, 390);
    assert!(h.tracker.is_processed("CAM-100").await);

    let submissions = h.service.submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].label, "analytics");
    assert_eq!(submissions[0].job_name, "CAM-100, 9876");
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_scenario_b_short_data_is_incomplete() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-101", fixtures::ticket_fields(55511, "2024-02-04"))
        .await;
    h.resolver.set_chain(55511, "812", "9876").await;
    h.service
        .script("CAM-101", JobScript::done("400\t390\t2023-01-02\t2024-02-03"))
        .await;

    let summary = h.crawler().run(today()).await.unwrap();

    assert_eq!(summary.success, 0);
    assert_eq!(summary.incomplete, 1);
    assert!(h.tracker.comments().await.is_empty());
    assert!(!h.tracker.is_processed("CAM-101").await);
}

#[tokio::test]
async fn test_scenario_c_missing_identifier_notifies_once() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-102", fixtures::ticket_fields(55512, "2024-02-04"))
        .await;
    h.resolver.set_study(55512, None).await;

    let summary = h.crawler().run(today()).await.unwrap();

    assert_eq!(summary.no_identifier, 1);
    assert!(h.service.submissions().await.is_empty());

    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        NotificationRoute {
            to: sent[0].to.clone(),
            from: sent[0].from.clone(),
            subject: sent[0].subject.clone(),
        },
        NotificationRoute::from(&h.config.email)
    );
    assert!(sent[0].body.contains("Ticket: CAM-102"));
    assert!(sent[0].body.contains("Study Number: 55512"));
    assert!(sent[0].body.contains("Study Post-Period End Date (plus 1 day): 2024-02-05"));
    assert!(h.tracker.comments().await.is_empty());
}

#[tokio::test]
async fn test_mixed_batch_accounts_for_every_ticket() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-1", fixtures::ticket_fields(1, "2024-02-04"))
        .await;
    h.tracker
        .add_ticket("CAM-2", fixtures::ticket_fields(2, "2024-02-04"))
        .await;
    h.tracker
        .add_ticket("CAM-3", fixtures::ticket_fields(3, "2024-02-10"))
        .await;
    h.tracker
        .add_ticket("CAM-4", fixtures::ticket_fields(4, "2024-02-04"))
        .await;
    h.tracker.add_malformed_ticket("CAM-5", "missing date").await;

    h.resolver.set_chain(1, "p1", "101").await;
    h.resolver.set_chain(2, "p2", "102").await;

    h.service
        .script("CAM-1", JobScript::done("400\t390\t2023-01-02\t2024-02-05"))
        .await;
    h.service
        .script("CAM-2", JobScript::done("400\t390\t2023-01-02\t2024-02-05").failed_runs(3))
        .await;

    let summary = h.crawler().run(today()).await.unwrap();

    assert_eq!(summary.tickets_found, 5);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.not_yet_ready, 1);
    assert_eq!(summary.not_yet_ready_keys, vec!["CAM-3".to_string()]);
    assert_eq!(summary.no_identifier, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(
        summary.success
            + summary.incomplete
            + summary.errors
            + summary.not_yet_ready
            + summary.no_identifier
            + summary.rejected,
        summary.tickets_found
    );

    assert!(h.tracker.is_processed("CAM-1").await);
    assert!(!h.tracker.is_processed("CAM-2").await);
    assert_eq!(h.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn test_processed_tickets_are_not_picked_up_again() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-1", fixtures::ticket_fields(1, "2024-02-04"))
        .await;
    h.resolver.set_chain(1, "p1", "101").await;
    h.service
        .script("CAM-1", JobScript::done("400\t390\t2023-01-02\t2024-02-05"))
        .await;

    let crawler = h.crawler();
    let first = crawler.run(today()).await.unwrap();
    let second = crawler.run(today()).await.unwrap();

    assert_eq!(first.success, 1);
    assert_eq!(second.tickets_found, 0);
    assert_eq!(h.service.submit_calls("CAM-1").await, 1);
}

#[tokio::test]
async fn test_no_tickets_is_an_empty_run() {
    let h = TestHarness::new();
    let summary = h.crawler().run(today()).await.unwrap();

    assert_eq!(summary.tickets_found, 0);
    assert_eq!(h.tracker.searches().await.len(), 1);
    assert_eq!(h.tracker.searches().await[0].issue_type, "Measurement Strategy");
}

#[tokio::test]
async fn test_tracker_outage_aborts_run() {
    let h = TestHarness::new();
    h.tracker
        .add_ticket("CAM-1", fixtures::ticket_fields(1, "2024-02-04"))
        .await;
    h.tracker.set_search_error(Some("connection refused")).await;

    let err = assert_err!(h.crawler().run(today()).await);

    assert!(matches!(err, CrawlerError::TicketSearch(_)));
    assert!(h.resolver.study_lookups().await.is_empty());
    assert!(h.service.submissions().await.is_empty());
}
