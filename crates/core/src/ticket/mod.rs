//! Issue tracker access for the work items the crawler validates.

mod jira;
mod source;
mod types;

pub use jira::{build_jql, parse_fields, render_data_comment, JiraClient};
pub use source::{TicketError, TicketSink, TicketSource};
pub use types::{owner_handle, study_id_from_url, SearchPredicate, TicketFields, TicketRef};
