use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::DispatchConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub resolver: ResolverConfig,
    pub query_service: QueryServiceConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Issue tracker (Jira) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Tracker base URL (e.g., "https://jira.example.com")
    pub url: String,
    pub username: String,
    pub token: String,
    #[serde(default = "default_project")]
    pub project: String,
    pub issue_type: String,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub excluded_labels: Vec<String>,
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default)]
    pub excluded_media_partners: Vec<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Label added to a ticket once its data has been reported
    #[serde(default = "default_processed_label")]
    pub processed_label: String,
    /// Owner handle used when a ticket has no lead analyst
    #[serde(default = "default_owner")]
    pub default_owner: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub fields: TrackerFieldIds,
}

/// Custom field ids backing the typed ticket record
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerFieldIds {
    #[serde(default = "default_study_ref_field")]
    pub study_ref: String,
    #[serde(default = "default_post_period_end_field")]
    pub post_period_end: String,
    #[serde(default = "default_anchor_date_field")]
    pub anchor_date: String,
    #[serde(default = "default_owner_field")]
    pub owner: String,
}

impl Default for TrackerFieldIds {
    fn default() -> Self {
        Self {
            study_ref: default_study_ref_field(),
            post_period_end: default_post_period_end_field(),
            anchor_date: default_anchor_date_field(),
            owner: default_owner_field(),
        }
    }
}

fn default_project() -> String {
    "CAM".to_string()
}

fn default_processed_label() -> String {
    "data_complete".to_string()
}

fn default_owner() -> String {
    "retailanalytics".to_string()
}

fn default_max_results() -> u32 {
    500
}

fn default_timeout() -> u32 {
    30
}

fn default_study_ref_field() -> String {
    "customfield_17018".to_string()
}

fn default_post_period_end_field() -> String {
    "customfield_11426".to_string()
}

fn default_anchor_date_field() -> String {
    "customfield_10431".to_string()
}

fn default_owner_field() -> String {
    "customfield_12325".to_string()
}

/// Study/account lookup service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Prefix the study id is appended to
    pub study_url: String,
    /// Prefix the parent company id is appended to
    pub account_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Remote query service (Qubole) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryServiceConfig {
    pub url: String,
    pub token: String,
    #[serde(default = "default_cluster_label")]
    pub cluster_label: String,
    #[serde(default = "default_query_timeout")]
    pub timeout_secs: u32,
}

fn default_cluster_label() -> String {
    "default".to_string()
}

fn default_query_timeout() -> u32 {
    60
}

/// SMTP notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub tls: bool,
    pub from: String,
    pub to: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_smtp_port() -> u16 {
    25
}

fn default_subject() -> String {
    "Retail Data Crawler - missing Provider ID".to_string()
}

/// Readiness gate and date range configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Fixed offset of the operational timezone, in hours from UTC
    #[serde(default = "default_offset_hours")]
    pub timezone_offset_hours: i32,
    /// Days subtracted from the anchor date to get the query range start
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone_offset_hours: default_offset_hours(),
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_offset_hours() -> i32 {
    -6
}

fn default_lookback_days() -> i64 {
    365
}

/// Log file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory prefix for run logs
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Log files older than this are purged at the end of a run
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Mirror log output to stderr
    #[serde(default)]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            app_name: default_app_name(),
            retention_days: default_retention_days(),
            console: false,
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("logs")
}

fn default_app_name() -> String {
    "retail_data_crawler".to_string()
}

fn default_retention_days() -> u64 {
    30
}

/// Metrics export configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write the Prometheus text exposition here at the end of each run
    #[serde(default)]
    pub textfile_path: Option<PathBuf>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub tracker: SanitizedTrackerConfig,
    pub resolver: ResolverConfig,
    pub query_service: SanitizedQueryServiceConfig,
    pub email: EmailConfig,
    pub dispatch: DispatchConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTrackerConfig {
    pub url: String,
    pub username: String,
    pub token_configured: bool,
    pub project: String,
    pub issue_type: String,
    pub processed_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQueryServiceConfig {
    pub url: String,
    pub token_configured: bool,
    pub cluster_label: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            tracker: SanitizedTrackerConfig {
                url: config.tracker.url.clone(),
                username: config.tracker.username.clone(),
                token_configured: !config.tracker.token.is_empty(),
                project: config.tracker.project.clone(),
                issue_type: config.tracker.issue_type.clone(),
                processed_label: config.tracker.processed_label.clone(),
            },
            resolver: config.resolver.clone(),
            query_service: SanitizedQueryServiceConfig {
                url: config.query_service.url.clone(),
                token_configured: !config.query_service.token.is_empty(),
                cluster_label: config.query_service.cluster_label.clone(),
            },
            email: config.email.clone(),
            dispatch: config.dispatch.clone(),
            schedule: config.schedule.clone(),
            logging: config.logging.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MINIMAL: &str = r#"
[tracker]
url = "https://jira.example.com"
username = "svc"
token = "jira-secret"
issue_type = "Measurement Strategy"

[resolver]
study_url = "https://studies.example.com/api/studies/"
account_url = "https://accounts.example.com/api/accounts/"

[query_service]
url = "https://api.qubole.example.com"
token = "qds-secret"

[email]
smtp_host = "mailhost.example.com"
from = "ci@example.com"
to = "retail@example.com"
"#;

    #[test]
    fn test_deserialize_minimal_config_applies_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.tracker.project, "CAM");
        assert_eq!(config.tracker.processed_label, "data_complete");
        assert_eq!(config.tracker.default_owner, "retailanalytics");
        assert_eq!(config.tracker.max_results, 500);
        assert_eq!(config.tracker.fields.study_ref, "customfield_17018");
        assert_eq!(config.email.smtp_port, 25);
        assert!(!config.email.tls);
        assert_eq!(config.schedule.timezone_offset_hours, -6);
        assert_eq!(config.schedule.lookback_days, 365);
        assert_eq!(config.dispatch.max_launch_attempts, 3);
        assert_eq!(config.logging.retention_days, 30);
        assert!(config.metrics.textfile_path.is_none());
    }

    #[test]
    fn test_deserialize_missing_tracker_fails() {
        let toml = r#"
[email]
smtp_host = "mailhost.example.com"
from = "ci@example.com"
to = "retail@example.com"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_search_predicate_lists() {
        let toml = format!(
            "{}\n{}",
            MINIMAL.replace(
                "issue_type = \"Measurement Strategy\"",
                r#"issue_type = "Measurement Strategy"
statuses = ["Transactions"]
excluded_media_partners = ["Pinterest", "Twitter"]
data_source = "Transaction""#
            ),
            "[dispatch]\nmax_concurrent_jobs = 4\n"
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.tracker.statuses, vec!["Transactions"]);
        assert_eq!(config.tracker.excluded_media_partners.len(), 2);
        assert_eq!(config.tracker.data_source.as_deref(), Some("Transaction"));
        assert_eq!(config.dispatch.max_concurrent_jobs, 4);
    }

    #[test]
    fn test_sanitized_config_hides_tokens() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.tracker.token_configured);
        assert!(sanitized.query_service.token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("jira-secret"));
        assert!(!json.contains("qds-secret"));
    }
}
