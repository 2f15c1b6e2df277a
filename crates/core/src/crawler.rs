//! Daily crawl driver.
//!
//! Wires ticket search, ingestion, dispatch and reduction into one run.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::ingest::IngestionFilter;
use crate::metrics::TICKETS_FOUND;
use crate::notify::{NotificationRoute, Notifier};
use crate::orchestrator::{DispatchOrchestrator, Outcome};
use crate::query::{QueryRunner, QueryService};
use crate::reducer::{OutcomeReducer, RunSummary};
use crate::resolver::ProviderResolver;
use crate::ticket::{SearchPredicate, TicketError, TicketSink, TicketSource};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// The tracker could not be searched.
    #[error("ticket search failed: {0}")]
    TicketSearch(#[source] TicketError),
}

/// External services a crawler talks to.
pub struct Collaborators {
    pub source: Arc<dyn TicketSource>,
    pub sink: Arc<dyn TicketSink>,
    pub resolver: Arc<dyn ProviderResolver>,
    pub query_service: Arc<dyn QueryService>,
    pub notifier: Arc<dyn Notifier>,
}

/// One day's crawl: find tickets, run their queries, report back.
pub struct DataCrawler {
    source: Arc<dyn TicketSource>,
    predicate: SearchPredicate,
    filter: IngestionFilter,
    orchestrator: DispatchOrchestrator,
    reducer: OutcomeReducer,
}

impl DataCrawler {
    pub fn new(
        source: Arc<dyn TicketSource>,
        predicate: SearchPredicate,
        filter: IngestionFilter,
        orchestrator: DispatchOrchestrator,
        reducer: OutcomeReducer,
    ) -> Self {
        Self {
            source,
            predicate,
            filter,
            orchestrator,
            reducer,
        }
    }

    /// Assemble a crawler from configuration and collaborators.
    pub fn from_config(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            source,
            sink,
            resolver,
            query_service,
            notifier,
        } = collaborators;

        let filter = IngestionFilter::new(
            Arc::clone(&source),
            resolver,
            &config.schedule,
            config.tracker.default_owner.clone(),
        );
        let runner = QueryRunner::new(
            query_service,
            config.query_service.cluster_label.clone(),
            config.dispatch.poll_policy(),
        );
        let orchestrator = DispatchOrchestrator::new(config.dispatch.clone(), Arc::new(runner));
        let reducer = OutcomeReducer::new(sink, notifier, NotificationRoute::from(&config.email));

        Self::new(
            source,
            SearchPredicate::from_config(&config.tracker),
            filter,
            orchestrator,
            reducer,
        )
    }

    /// Run one crawl as of `today` (operational date).
    ///
    /// Only a failed ticket search aborts the run; every per-ticket problem
    /// ends up in the summary.
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary, CrawlerError> {
        let tickets = self
            .source
            .find(&self.predicate)
            .await
            .map_err(CrawlerError::TicketSearch)?;

        TICKETS_FOUND.set(tickets.len() as i64);
        info!(count = tickets.len(), today = %today, "Tickets found");

        if tickets.is_empty() {
            info!("There were no tickets to process today");
            return Ok(RunSummary::default());
        }

        let report = self.filter.filter(&tickets, today).await;
        for (ticket, reason) in &report.rejected {
            warn!(ticket = %ticket, reason = %reason, "Ticket skipped this run");
        }

        let mut outcomes: Vec<Outcome> = report
            .not_yet_ready
            .into_iter()
            .map(|ticket| Outcome::NotYetReady { ticket })
            .collect();
        outcomes.extend(
            report
                .no_identifier
                .into_iter()
                .map(|candidate| Outcome::NoIdentifier { candidate }),
        );
        outcomes.extend(self.orchestrator.dispatch(report.jobs).await);

        let mut summary = self.reducer.reduce_all(&outcomes).await;
        summary.tickets_found = tickets.len();
        summary.rejected = report.rejected.len();

        info!(
            found = summary.tickets_found,
            success = summary.success,
            incomplete = summary.incomplete,
            no_identifier = summary.no_identifier,
            not_yet_ready = summary.not_yet_ready,
            errors = summary.errors,
            rejected = summary.rejected,
            "Run complete"
        );
        Ok(summary)
    }
}

/// Fixed offset for the operational timezone; out-of-range offsets fall back to UTC.
pub fn operational_offset(offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Current time in the operational timezone.
pub fn operational_now(offset_hours: i32) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&operational_offset(offset_hours))
}

/// Today's date in the operational timezone.
pub fn operational_today(offset_hours: i32) -> NaiveDate {
    operational_now(offset_hours).date_naive()
}
