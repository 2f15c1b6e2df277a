//! Ticket ingestion.
//!
//! Turns raw tracker tickets into query jobs, splitting off tickets that
//! are not ready yet, tickets whose provider id cannot be resolved, and
//! tickets whose fields cannot be read.

mod filter;

pub use filter::{is_ready, IngestionFilter};

use serde::Serialize;

use crate::orchestrator::{JobCandidate, QueryJob};
use crate::ticket::TicketRef;

/// Result of one ingestion pass. Every input ticket lands in exactly one list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    /// Eligible tickets with a resolved provider id.
    pub jobs: Vec<QueryJob>,
    /// Eligible tickets whose identifier chain came back empty.
    pub no_identifier: Vec<JobCandidate>,
    /// Tickets whose post period has not ended yet.
    pub not_yet_ready: Vec<TicketRef>,
    /// Tickets skipped this run, with the reason.
    pub rejected: Vec<(TicketRef, String)>,
}

impl IngestionReport {
    /// Total tickets accounted for.
    pub fn len(&self) -> usize {
        self.jobs.len() + self.no_identifier.len() + self.not_yet_ready.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
