//! HTTP implementation of the provider resolver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::orchestrator::is_valid_provider_id;

use super::{ProviderResolver, ResolverError};

const PROVIDER_REFERENCE_TYPE: &str = "provider";

/// Resolver backed by the study and account lookup services.
pub struct HttpProviderResolver {
    client: Client,
    config: ResolverConfig,
}

impl HttpProviderResolver {
    pub fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| {
                ResolverError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// GET a lookup document. A 404 is an empty answer, not an error.
    async fn get_json(&self, url: &str) -> Result<Option<Value>, ResolverError> {
        debug!(url = %url, "Resolver lookup");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolverError::Timeout
                } else {
                    ResolverError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ResolverError::ApiError {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ResolverError::ParseError(e.to_string()))?;
        Ok(Some(body))
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract `parentCompanyId` from a study document.
pub fn parent_company_id(study: &Value) -> Option<String> {
    study.get("parentCompanyId").and_then(id_string)
}

/// Extract the provider `referenceId` from an account document.
///
/// Ids that are not plain alphanumeric tokens are treated as absent.
pub fn provider_reference_id(account: &Value) -> Option<String> {
    account
        .get("accountReferences")?
        .as_array()?
        .iter()
        .find(|reference| {
            reference.get("referenceType").and_then(Value::as_str) == Some(PROVIDER_REFERENCE_TYPE)
        })
        .and_then(|reference| reference.get("referenceId"))
        .and_then(id_string)
        .filter(|id| is_valid_provider_id(id))
}

#[async_trait]
impl ProviderResolver for HttpProviderResolver {
    async fn resolve_study(&self, study_id: u64) -> Result<Option<String>, ResolverError> {
        let url = format!("{}{}", self.config.study_url, study_id);
        Ok(self.get_json(&url).await?.as_ref().and_then(parent_company_id))
    }

    async fn resolve_account(&self, parent_id: &str) -> Result<Option<String>, ResolverError> {
        let url = format!(
            "{}{}",
            self.config.account_url,
            urlencoding::encode(parent_id)
        );
        Ok(self
            .get_json(&url)
            .await?
            .as_ref()
            .and_then(provider_reference_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parent_company_id() {
        assert_eq!(
            parent_company_id(&json!({"id": 55512, "parentCompanyId": 812})),
            Some("812".to_string())
        );
        assert_eq!(
            parent_company_id(&json!({"parentCompanyId": "A-812"})),
            Some("A-812".to_string())
        );
        assert_eq!(parent_company_id(&json!({"parentCompanyId": null})), None);
        assert_eq!(parent_company_id(&json!({})), None);
    }

    #[test]
    fn test_provider_reference_id() {
        let account = json!({
            "accountReferences": [
                {"referenceType": "salesforce", "referenceId": "sf-1"},
                {"referenceType": "provider", "referenceId": 9876},
                {"referenceType": "provider", "referenceId": 1111}
            ]
        });
        assert_eq!(provider_reference_id(&account), Some("9876".to_string()));
    }

    #[test]
    fn test_provider_reference_id_missing() {
        assert_eq!(provider_reference_id(&json!({"accountReferences": []})), None);
        assert_eq!(
            provider_reference_id(&json!({
                "accountReferences": [{"referenceType": "salesforce", "referenceId": "x"}]
            })),
            None
        );
        assert_eq!(provider_reference_id(&json!({"accountReferences": null})), None);
    }

    #[test]
    fn test_provider_reference_id_rejects_non_alphanumeric() {
        let account = json!({
            "accountReferences": [{"referenceType": "provider", "referenceId": "1) OR (1=1"}]
        });
        assert_eq!(provider_reference_id(&account), None);

        let account = json!({
            "accountReferences": [{"referenceType": "provider", "referenceId": -42}]
        });
        assert_eq!(provider_reference_id(&account), None);
    }

    #[tokio::test]
    async fn test_resolve_chain_short_circuits() {
        use crate::testing::MockProviderResolver;

        let resolver = MockProviderResolver::new();
        resolver.set_account("812", Some("9876")).await;

        // Study has no parent company, so the account hop never runs.
        assert_eq!(resolver.resolve(55512).await.unwrap(), None);
        assert!(resolver.account_lookups().await.is_empty());

        resolver.set_study(55513, Some("812")).await;
        assert_eq!(resolver.resolve(55513).await.unwrap(), Some("9876".to_string()));
        assert_eq!(resolver.account_lookups().await, vec!["812".to_string()]);
    }
}
