//! Jira implementation of the tracker capabilities.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{TrackerConfig, TrackerFieldIds};
use crate::query::TransactionSummary;

use super::{SearchPredicate, TicketError, TicketFields, TicketRef, TicketSink, TicketSource};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Jira field names used by the search predicate.
const CATEGORY_FIELD: &str = "Vertical";
const PARTNER_FIELD: &str = "Media Partner - HUB";
const SOURCE_FIELD: &str = "Data Source - HUB";

/// Jira REST client.
pub struct JiraClient {
    client: Client,
    config: TrackerConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueKey>,
}

#[derive(Debug, Deserialize)]
struct IssueKey {
    key: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    fields: Value,
}

impl JiraClient {
    /// Create a new Jira client.
    pub fn new(config: TrackerConfig) -> Result<Self, TicketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TicketError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn issue_url(&self, ticket_key: &str) -> String {
        format!(
            "{}/rest/api/2/issue/{}",
            self.base_url(),
            urlencoding::encode(ticket_key)
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.username, Some(&self.config.token))
    }

    /// Send a request and return the body, mapping transport and status errors.
    async fn send(&self, request: RequestBuilder, ticket_key: Option<&str>) -> Result<String, TicketError> {
        let response = self.authed(request).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                TicketError::Connection(e.to_string())
            } else {
                TicketError::Api(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 404 {
            if let Some(key) = ticket_key {
                return Err(TicketError::NotFound(key.to_string()));
            }
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TicketError::Api(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl TicketSource for JiraClient {
    async fn find(&self, predicate: &SearchPredicate) -> Result<Vec<TicketRef>, TicketError> {
        let jql = build_jql(predicate);
        debug!(jql = %jql, "Searching Jira");

        let url = format!("{}/rest/api/2/search", self.base_url());
        let max_results = predicate.max_results.to_string();
        let request = self.client.get(&url).query(&[
            ("jql", jql.as_str()),
            ("maxResults", max_results.as_str()),
            ("fields", "key"),
        ]);

        let body = self.send(request, None).await?;
        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| TicketError::Api(format!("Failed to parse search response: {}", e)))?;

        Ok(response
            .issues
            .into_iter()
            .map(|issue| TicketRef::new(issue.key))
            .collect())
    }

    async fn fields(&self, ticket_key: &str) -> Result<TicketFields, TicketError> {
        let ids = &self.config.fields;
        let wanted = [
            ids.study_ref.as_str(),
            ids.post_period_end.as_str(),
            ids.anchor_date.as_str(),
            ids.owner.as_str(),
        ]
        .join(",");

        let request = self
            .client
            .get(self.issue_url(ticket_key))
            .query(&[("fields", wanted.as_str())]);

        let body = self.send(request, Some(ticket_key)).await?;
        let issue: IssueResponse = serde_json::from_str(&body)
            .map_err(|e| TicketError::Api(format!("Failed to parse issue {}: {}", ticket_key, e)))?;

        parse_fields(ticket_key, &issue.fields, ids)
    }
}

#[async_trait]
impl TicketSink for JiraClient {
    async fn comment(
        &self,
        ticket_key: &str,
        owner: &str,
        summary: &TransactionSummary,
    ) -> Result<(), TicketError> {
        let url = format!("{}/comment", self.issue_url(ticket_key));
        let body = json!({ "body": render_data_comment(ticket_key, owner, summary) });

        self.send(self.client.post(&url).json(&body), Some(ticket_key))
            .await?;
        Ok(())
    }

    async fn mark_processed(&self, ticket_key: &str) -> Result<(), TicketError> {
        let body = json!({
            "update": { "labels": [ { "add": self.config.processed_label } ] }
        });

        self.send(
            self.client.put(self.issue_url(ticket_key)).json(&body),
            Some(ticket_key),
        )
        .await?;
        Ok(())
    }
}

/// Quote a JQL string literal.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("({})", quoted.join(", "))
}

/// Build the JQL query for a search predicate. Empty clauses are omitted.
pub fn build_jql(predicate: &SearchPredicate) -> String {
    let mut clauses = vec![
        format!("project in ({})", quote(&predicate.project)),
        format!("type = {}", quote(&predicate.issue_type)),
    ];

    if !predicate.statuses.is_empty() {
        clauses.push(format!("status in {}", quote_list(&predicate.statuses)));
    }
    if !predicate.excluded_labels.is_empty() {
        // Unlabelled tickets would otherwise drop out of a "not in" clause.
        clauses.push(format!(
            "(labels is EMPTY OR labels not in {})",
            quote_list(&predicate.excluded_labels)
        ));
    }
    if !predicate.categories.is_empty() {
        clauses.push(format!(
            "{} in {}",
            quote(CATEGORY_FIELD),
            quote_list(&predicate.categories)
        ));
    }
    if !predicate.excluded_partners.is_empty() {
        clauses.push(format!(
            "{} not in {}",
            quote(PARTNER_FIELD),
            quote_list(&predicate.excluded_partners)
        ));
    }
    if let Some(source) = &predicate.source_pattern {
        clauses.push(format!("{} ~ {}", quote(SOURCE_FIELD), quote(source)));
    }
    if let Some(text) = &predicate.text {
        clauses.push(format!("summary ~ {}", quote(text)));
    }

    clauses.join(" AND ")
}

fn malformed(ticket_key: &str, field: &str, reason: impl Into<String>) -> TicketError {
    TicketError::MalformedField {
        ticket_key: ticket_key.to_string(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn required_str<'a>(
    ticket_key: &str,
    fields: &'a Value,
    id: &str,
) -> Result<&'a str, TicketError> {
    fields
        .get(id)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(ticket_key, id, "missing"))
}

fn required_date(ticket_key: &str, fields: &Value, id: &str) -> Result<NaiveDate, TicketError> {
    let raw = required_str(ticket_key, fields, id)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| malformed(ticket_key, id, format!("{} ({})", e, raw)))
}

/// Map the raw custom fields of an issue into the typed record.
pub fn parse_fields(
    ticket_key: &str,
    fields: &Value,
    ids: &TrackerFieldIds,
) -> Result<TicketFields, TicketError> {
    let study_ref_url = required_str(ticket_key, fields, &ids.study_ref)?.to_string();
    let post_period_end = required_date(ticket_key, fields, &ids.post_period_end)?;
    let anchor_date = required_date(ticket_key, fields, &ids.anchor_date)?;

    // User pickers come back as objects; plain text fields as strings.
    let owner_name = match fields.get(&ids.owner) {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Object(user)) => user
            .get("displayName")
            .or_else(|| user.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
    .filter(|name| !name.trim().is_empty());

    Ok(TicketFields {
        study_ref_url,
        post_period_end,
        anchor_date,
        owner_name,
    })
}

/// Render the data-availability comment posted on a ticket.
pub fn render_data_comment(ticket_key: &str, owner: &str, summary: &TransactionSummary) -> String {
    format!(
        "[~{owner}], transaction data has been found for Ticket =>    *{ticket_key}*\n\
         \n\
         ||Return Parameter||Result||\n\
         |Total Days in Period|{days}|\n\
         |Distinct Days Transaction Count|{distinct}|\n\
         |Earliest Transaction Date|{earliest}|\n\
         |Final Transaction Date|{latest}|\n",
        owner = owner,
        ticket_key = ticket_key,
        days = summary.day_count,
        distinct = summary.distinct_transaction_days,
        earliest = summary.earliest_date.format(DATE_FORMAT),
        latest = summary.latest_date.format(DATE_FORMAT),
    )
}
