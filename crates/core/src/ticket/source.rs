//! Tracker capability traits and error type.

use std::fmt;

use async_trait::async_trait;

use crate::query::TransactionSummary;
use crate::ticket::{SearchPredicate, TicketFields, TicketRef};

/// Error type for tracker operations.
#[derive(Debug)]
pub enum TicketError {
    /// Ticket not found.
    NotFound(String),
    /// Tracker unreachable or the request timed out.
    Connection(String),
    /// Tracker answered with an error status or an unreadable body.
    Api(String),
    /// A required field is missing or cannot be parsed.
    MalformedField {
        ticket_key: String,
        field: String,
        reason: String,
    },
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(key) => write!(f, "Ticket not found: {}", key),
            TicketError::Connection(msg) => write!(f, "Tracker connection failed: {}", msg),
            TicketError::Api(msg) => write!(f, "Tracker API error: {}", msg),
            TicketError::MalformedField {
                ticket_key,
                field,
                reason,
            } => write!(
                f,
                "Malformed field {} on ticket {}: {}",
                field, ticket_key, reason
            ),
        }
    }
}

impl std::error::Error for TicketError {}

/// Read side of the tracker.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Find tickets matching the predicate.
    async fn find(&self, predicate: &SearchPredicate) -> Result<Vec<TicketRef>, TicketError>;

    /// Read the typed fields of one ticket.
    async fn fields(&self, ticket_key: &str) -> Result<TicketFields, TicketError>;
}

/// Write side of the tracker.
#[async_trait]
pub trait TicketSink: Send + Sync {
    /// Post the data-availability comment addressed to `owner`.
    async fn comment(
        &self,
        ticket_key: &str,
        owner: &str,
        summary: &TransactionSummary,
    ) -> Result<(), TicketError>;

    /// Mark the ticket as processed so later searches skip it.
    /// Applying it to an already-marked ticket is a no-op.
    async fn mark_processed(&self, ticket_key: &str) -> Result<(), TicketError>;
}
