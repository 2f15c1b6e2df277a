//! Qubole command API implementation of the query service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::QueryServiceConfig;

use super::{JobHandle, JobStatus, QueryService, QueryServiceError};

const COMMAND_TYPE: &str = "HiveCommand";

/// Qubole REST client.
pub struct QuboleClient {
    client: Client,
    config: QueryServiceConfig,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    id: Value,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    results: String,
    #[serde(default = "default_inline")]
    inline: bool,
}

fn default_inline() -> bool {
    true
}

impl QuboleClient {
    /// Create a new Qubole client.
    pub fn new(config: QueryServiceConfig) -> Result<Self, QueryServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| {
                QueryServiceError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn commands_url(&self) -> String {
        format!(
            "{}/api/v1.2/commands",
            self.config.url.trim_end_matches('/')
        )
    }

    fn command_url(&self, id: &str) -> String {
        format!("{}/{}", self.commands_url(), urlencoding::encode(id))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, QueryServiceError> {
        let response = request
            .header("X-AUTH-TOKEN", &self.config.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryServiceError::Timeout
                } else if e.is_connect() {
                    QueryServiceError::ConnectionFailed(e.to_string())
                } else {
                    QueryServiceError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            return Err(match status.as_u16() {
                404 => QueryServiceError::NotFound(message),
                _ => QueryServiceError::ApiError(message),
            });
        }

        Ok(body)
    }
}

/// Map a Qubole command status string to a job status.
pub fn parse_command_status(status: &str) -> JobStatus {
    match status.to_ascii_lowercase().as_str() {
        "done" => JobStatus::Done,
        "error" | "cancelled" => JobStatus::Failed,
        "running" => JobStatus::Running,
        _ => JobStatus::Submitted,
    }
}

fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl QueryService for QuboleClient {
    async fn submit(
        &self,
        query_text: &str,
        label: &str,
        job_name: &str,
    ) -> Result<JobHandle, QueryServiceError> {
        let body = json!({
            "command_type": COMMAND_TYPE,
            "query": query_text,
            "label": label,
            "name": job_name,
        });

        let response = self
            .send(self.client.post(self.commands_url()).json(&body))
            .await
            .map_err(|e| match e {
                QueryServiceError::ApiError(msg) => QueryServiceError::Rejected(msg),
                other => other,
            })?;

        let command: CommandResponse = serde_json::from_str(&response)
            .map_err(|e| QueryServiceError::Rejected(format!("Unreadable response: {}", e)))?;
        let id = id_to_string(&command.id)
            .ok_or_else(|| QueryServiceError::Rejected("No command id returned".to_string()))?;

        let status = command
            .status
            .as_deref()
            .map(parse_command_status)
            .unwrap_or(JobStatus::Submitted);

        debug!(command_id = %id, job_name = %job_name, "Command submitted");
        Ok(JobHandle::new(id, status))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, QueryServiceError> {
        let response = self
            .send(self.client.get(self.command_url(&handle.id)))
            .await?;
        let status: StatusResponse = serde_json::from_str(&response)
            .map_err(|e| QueryServiceError::ApiError(format!("Unreadable status: {}", e)))?;
        Ok(parse_command_status(&status.status))
    }

    async fn fetch(&self, handle: &JobHandle) -> Result<String, QueryServiceError> {
        let url = format!("{}/results", self.command_url(&handle.id));
        let response = self
            .send(self.client.get(&url).query(&[("inline", "true")]))
            .await?;
        let results: ResultsResponse = serde_json::from_str(&response)
            .map_err(|e| QueryServiceError::ApiError(format!("Unreadable results: {}", e)))?;

        if !results.inline {
            return Err(QueryServiceError::ApiError(format!(
                "results for command {} are not available inline",
                handle.id
            )));
        }

        Ok(results.results)
    }
}
