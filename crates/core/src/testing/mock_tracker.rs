//! Mock ticket tracker for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::query::TransactionSummary;
use crate::ticket::{SearchPredicate, TicketError, TicketFields, TicketRef, TicketSink, TicketSource};

/// A recorded comment for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedComment {
    pub ticket_key: String,
    pub owner: String,
    pub summary: TransactionSummary,
}

/// Mock implementation of both tracker traits.
///
/// Tickets added with `add_ticket` are returned by `find` in insertion
/// order, unless they have been marked processed.
///
/// # Example
///
/// ```rust,ignore
/// let tracker = MockTicketTracker::new();
/// tracker.add_ticket("CAM-1", fixtures::ticket_fields(55512, "2024-02-04")).await;
///
/// // ... run the crawler ...
///
/// assert_eq!(tracker.comments().await.len(), 1);
/// assert!(tracker.is_processed("CAM-1").await);
/// ```
#[derive(Debug, Default)]
pub struct MockTicketTracker {
    order: Arc<RwLock<Vec<String>>>,
    tickets: Arc<RwLock<HashMap<String, Result<TicketFields, String>>>>,
    processed: Arc<RwLock<HashSet<String>>>,
    comments: Arc<RwLock<Vec<RecordedComment>>>,
    searches: Arc<RwLock<Vec<SearchPredicate>>>,
    /// If set, `find` fails with a connection error carrying this message.
    search_error: Arc<RwLock<Option<String>>>,
}

impl MockTicketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ticket with readable fields.
    pub async fn add_ticket(&self, key: &str, fields: TicketFields) {
        self.insert(key, Ok(fields)).await;
    }

    /// Add a ticket whose fields cannot be read.
    pub async fn add_malformed_ticket(&self, key: &str, reason: &str) {
        self.insert(key, Err(reason.to_string())).await;
    }

    async fn insert(&self, key: &str, fields: Result<TicketFields, String>) {
        let mut order = self.order.write().await;
        if !order.iter().any(|k| k == key) {
            order.push(key.to_string());
        }
        self.tickets.write().await.insert(key.to_string(), fields);
    }

    pub async fn set_search_error(&self, message: Option<&str>) {
        *self.search_error.write().await = message.map(str::to_string);
    }

    pub async fn comments(&self) -> Vec<RecordedComment> {
        self.comments.read().await.clone()
    }

    pub async fn is_processed(&self, key: &str) -> bool {
        self.processed.read().await.contains(key)
    }

    pub async fn processed_count(&self) -> usize {
        self.processed.read().await.len()
    }

    pub async fn searches(&self) -> Vec<SearchPredicate> {
        self.searches.read().await.clone()
    }
}

#[async_trait]
impl TicketSource for MockTicketTracker {
    async fn find(&self, predicate: &SearchPredicate) -> Result<Vec<TicketRef>, TicketError> {
        self.searches.write().await.push(predicate.clone());
        if let Some(message) = self.search_error.read().await.clone() {
            return Err(TicketError::Connection(message));
        }

        let processed = self.processed.read().await;
        Ok(self
            .order
            .read()
            .await
            .iter()
            .filter(|key| !processed.contains(*key))
            .map(TicketRef::new)
            .collect())
    }

    async fn fields(&self, ticket_key: &str) -> Result<TicketFields, TicketError> {
        match self.tickets.read().await.get(ticket_key) {
            Some(Ok(fields)) => Ok(fields.clone()),
            Some(Err(reason)) => Err(TicketError::MalformedField {
                ticket_key: ticket_key.to_string(),
                field: "post_period_end".to_string(),
                reason: reason.clone(),
            }),
            None => Err(TicketError::NotFound(ticket_key.to_string())),
        }
    }
}

#[async_trait]
impl TicketSink for MockTicketTracker {
    async fn comment(
        &self,
        ticket_key: &str,
        owner: &str,
        summary: &TransactionSummary,
    ) -> Result<(), TicketError> {
        if !self.tickets.read().await.contains_key(ticket_key) {
            return Err(TicketError::NotFound(ticket_key.to_string()));
        }
        self.comments.write().await.push(RecordedComment {
            ticket_key: ticket_key.to_string(),
            owner: owner.to_string(),
            summary: *summary,
        });
        Ok(())
    }

    async fn mark_processed(&self, ticket_key: &str) -> Result<(), TicketError> {
        if !self.tickets.read().await.contains_key(ticket_key) {
            return Err(TicketError::NotFound(ticket_key.to_string()));
        }
        self.processed.write().await.insert(ticket_key.to_string());
        Ok(())
    }
}
