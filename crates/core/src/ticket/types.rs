//! Core ticket data types.

use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Reference to a work item in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketRef {
    /// Tracker key (e.g., "CAM-1234").
    pub key: String,
}

impl TicketRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl std::fmt::Display for TicketRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Typed view of the tracker fields the crawler needs from a ticket.
///
/// The tracker stores these in custom fields; only the adapter knows
/// which field id backs which value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFields {
    /// Link to the study in the study builder; the study id is the last path segment.
    pub study_ref_url: String,
    /// Last day of the study's post period.
    pub post_period_end: NaiveDate,
    /// Study start date; the query range reaches back a year from here.
    pub anchor_date: NaiveDate,
    /// Lead analyst display name, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

/// Search predicate for selecting candidate tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPredicate {
    pub project: String,
    pub issue_type: String,
    pub statuses: Vec<String>,
    pub excluded_labels: Vec<String>,
    pub categories: Vec<String>,
    pub excluded_partners: Vec<String>,
    /// Pattern the ticket's data source must match.
    pub source_pattern: Option<String>,
    /// Free-text filter applied to the summary.
    pub text: Option<String>,
    pub max_results: u32,
}

impl SearchPredicate {
    /// Build the predicate from tracker configuration.
    pub fn from_config(config: &crate::config::TrackerConfig) -> Self {
        Self {
            project: config.project.clone(),
            issue_type: config.issue_type.clone(),
            statuses: config.statuses.clone(),
            excluded_labels: config.excluded_labels.clone(),
            categories: config.verticals.clone(),
            excluded_partners: config.excluded_media_partners.clone(),
            source_pattern: config.data_source.clone(),
            text: config.text.clone(),
            max_results: config.max_results,
        }
    }
}

/// Extract the numeric study id from a study reference URL.
///
/// Returns `None` when the URL does not parse or its last path segment
/// is not a number.
pub fn study_id_from_url(url: &str) -> Option<u64> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed
        .path_segments()?
        .rfind(|segment| !segment.is_empty())?
        .trim()
        .parse()
        .ok()
}

/// Convert a display name into a tracker mention handle ("Jane Doe" -> "Jane.Doe").
pub fn owner_handle(display_name: &str) -> String {
    display_name.split_whitespace().collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_id_from_url() {
        assert_eq!(
            study_id_from_url("https://studies.example.com/#/study/view/55512"),
            None
        );
        assert_eq!(
            study_id_from_url("https://studies.example.com/study/view/55512"),
            Some(55512)
        );
        assert_eq!(
            study_id_from_url("https://studies.example.com/study/55512/"),
            Some(55512)
        );
    }

    #[test]
    fn test_study_id_from_url_rejects_garbage() {
        assert_eq!(study_id_from_url("not a url"), None);
        assert_eq!(study_id_from_url("https://studies.example.com/study/abc"), None);
        assert_eq!(study_id_from_url("https://studies.example.com/"), None);
    }

    #[test]
    fn test_owner_handle() {
        assert_eq!(owner_handle("Jane Doe"), "Jane.Doe");
        assert_eq!(owner_handle("  Ada  King Lovelace "), "Ada.King.Lovelace");
        assert_eq!(owner_handle("retailanalytics"), "retailanalytics");
    }

    #[test]
    fn test_ticket_fields_serialization() {
        let fields = TicketFields {
            study_ref_url: "https://studies.example.com/study/1".to_string(),
            post_period_end: NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
            anchor_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            owner_name: None,
        };
        let json = serde_json::to_string(&fields).unwrap();
        assert!(json.contains("\"post_period_end\":\"2024-02-04\""));
        assert!(!json.contains("owner_name"));
    }
}
