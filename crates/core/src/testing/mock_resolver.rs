//! Mock provider resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::resolver::{ProviderResolver, ResolverError};

/// Mock implementation of the ProviderResolver trait.
///
/// Unmapped ids resolve to `None`, the same as an empty lookup.
#[derive(Debug, Default)]
pub struct MockProviderResolver {
    studies: Arc<RwLock<HashMap<u64, Option<String>>>>,
    accounts: Arc<RwLock<HashMap<String, Option<String>>>>,
    study_lookups: Arc<RwLock<Vec<u64>>>,
    account_lookups: Arc<RwLock<Vec<String>>>,
    /// If set, every lookup fails with a connection error.
    fail: Arc<RwLock<bool>>,
}

impl MockProviderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a study id to a parent company id (or to an empty answer).
    pub async fn set_study(&self, study_id: u64, parent_id: Option<&str>) {
        self.studies
            .write()
            .await
            .insert(study_id, parent_id.map(str::to_string));
    }

    /// Map a parent company id to a provider id (or to an empty answer).
    pub async fn set_account(&self, parent_id: &str, provider_id: Option<&str>) {
        self.accounts
            .write()
            .await
            .insert(parent_id.to_string(), provider_id.map(str::to_string));
    }

    /// Map a study straight through to a provider id.
    pub async fn set_chain(&self, study_id: u64, parent_id: &str, provider_id: &str) {
        self.set_study(study_id, Some(parent_id)).await;
        self.set_account(parent_id, Some(provider_id)).await;
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn study_lookups(&self) -> Vec<u64> {
        self.study_lookups.read().await.clone()
    }

    pub async fn account_lookups(&self) -> Vec<String> {
        self.account_lookups.read().await.clone()
    }
}

#[async_trait]
impl ProviderResolver for MockProviderResolver {
    async fn resolve_study(&self, study_id: u64) -> Result<Option<String>, ResolverError> {
        self.study_lookups.write().await.push(study_id);
        if *self.fail.read().await {
            return Err(ResolverError::ConnectionFailed("mock failure".to_string()));
        }
        Ok(self.studies.read().await.get(&study_id).cloned().flatten())
    }

    async fn resolve_account(&self, parent_id: &str) -> Result<Option<String>, ResolverError> {
        self.account_lookups.write().await.push(parent_id.to_string());
        if *self.fail.read().await {
            return Err(ResolverError::ConnectionFailed("mock failure".to_string()));
        }
        Ok(self.accounts.read().await.get(parent_id).cloned().flatten())
    }
}
