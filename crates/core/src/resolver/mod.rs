//! Provider identity resolution.
//!
//! A study id resolves to a parent company id, which in turn resolves to the
//! provider id the transaction query filters on. Either hop may come back
//! empty, which ends the chain.

mod http;

pub use http::{parent_company_id, provider_reference_id, HttpProviderResolver};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the lookup services.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Two-hop identity lookup.
///
/// `Ok(None)` means the lookup succeeded and found nothing.
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Resolve a study id to its parent company id.
    async fn resolve_study(&self, study_id: u64) -> Result<Option<String>, ResolverError>;

    /// Resolve a parent company id to its provider id.
    async fn resolve_account(&self, parent_id: &str) -> Result<Option<String>, ResolverError>;

    /// Run both hops, stopping at the first empty answer.
    async fn resolve(&self, study_id: u64) -> Result<Option<String>, ResolverError> {
        match self.resolve_study(study_id).await? {
            Some(parent_id) => self.resolve_account(&parent_id).await,
            None => Ok(None),
        }
    }
}
