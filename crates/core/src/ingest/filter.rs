//! Readiness gate and identity resolution for incoming tickets.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::orchestrator::{JobCandidate, QueryJob};
use crate::resolver::ProviderResolver;
use crate::ticket::{owner_handle, study_id_from_url, TicketFields, TicketRef, TicketSource};

use super::IngestionReport;

/// A ticket is ready once its post period ended strictly before `today`.
pub fn is_ready(post_period_end: NaiveDate, today: NaiveDate) -> bool {
    post_period_end < today
}

/// Single-pass filter from tracker tickets to query jobs.
pub struct IngestionFilter {
    source: Arc<dyn TicketSource>,
    resolver: Arc<dyn ProviderResolver>,
    lookback_days: i64,
    default_owner: String,
}

impl IngestionFilter {
    pub fn new(
        source: Arc<dyn TicketSource>,
        resolver: Arc<dyn ProviderResolver>,
        schedule: &ScheduleConfig,
        default_owner: impl Into<String>,
    ) -> Self {
        Self {
            source,
            resolver,
            lookback_days: schedule.lookback_days,
            default_owner: default_owner.into(),
        }
    }

    /// Sort tickets into jobs, not-ready, no-identifier and rejected.
    pub async fn filter(&self, tickets: &[TicketRef], today: NaiveDate) -> IngestionReport {
        let mut report = IngestionReport::default();

        for ticket in tickets {
            let fields = match self.source.fields(&ticket.key).await {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(ticket = %ticket, error = %e, "Unable to read ticket fields");
                    report.rejected.push((ticket.clone(), e.to_string()));
                    continue;
                }
            };

            if !is_ready(fields.post_period_end, today) {
                debug!(
                    ticket = %ticket,
                    post_period_end = %fields.post_period_end,
                    "Post period not over yet"
                );
                report.not_yet_ready.push(ticket.clone());
                continue;
            }

            let Some(candidate) = self.candidate(ticket, &fields) else {
                warn!(
                    ticket = %ticket,
                    anchor_date = %fields.anchor_date,
                    post_period_end = %fields.post_period_end,
                    "Query range falls outside the calendar"
                );
                report
                    .rejected
                    .push((ticket.clone(), "date out of range".to_string()));
                continue;
            };
            let Some(study_id) = candidate.study_id else {
                warn!(ticket = %ticket, study_ref = %candidate.study_ref, "No study id in study reference");
                report.no_identifier.push(candidate);
                continue;
            };

            let provider_id = match self.resolver.resolve(study_id).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    info!(ticket = %ticket, study_id, "No provider id for study");
                    report.no_identifier.push(candidate);
                    continue;
                }
                Err(e) => {
                    warn!(ticket = %ticket, study_id, error = %e, "Provider lookup failed");
                    report.no_identifier.push(candidate);
                    continue;
                }
            };

            match QueryJob::new(
                ticket.key.clone(),
                study_id,
                provider_id,
                candidate.range_start,
                fields.post_period_end,
                candidate.owner,
            ) {
                Ok(job) => report.jobs.push(job),
                Err(e) => {
                    warn!(ticket = %ticket, error = %e, "Rejecting ticket");
                    report.rejected.push((ticket.clone(), e.to_string()));
                }
            }
        }

        info!(
            jobs = report.jobs.len(),
            no_identifier = report.no_identifier.len(),
            not_yet_ready = report.not_yet_ready.len(),
            rejected = report.rejected.len(),
            "Ingestion complete"
        );
        report
    }

    /// `None` when either range bound is not a representable date.
    fn candidate(&self, ticket: &TicketRef, fields: &TicketFields) -> Option<JobCandidate> {
        let owner = fields
            .owner_name
            .as_deref()
            .map(owner_handle)
            .filter(|handle| !handle.is_empty())
            .unwrap_or_else(|| self.default_owner.clone());

        let range_start = Duration::try_days(self.lookback_days)
            .and_then(|lookback| fields.anchor_date.checked_sub_signed(lookback))?;
        let range_end = fields.post_period_end.checked_add_signed(Duration::days(1))?;

        Some(JobCandidate {
            ticket: ticket.clone(),
            study_ref: fields.study_ref_url.clone(),
            study_id: study_id_from_url(&fields.study_ref_url),
            range_start,
            range_end,
            owner,
        })
    }
}
