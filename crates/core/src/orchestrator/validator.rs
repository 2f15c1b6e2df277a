//! Completeness check applied to finished queries.

use chrono::NaiveDate;

use crate::query::QueryResult;

/// Verdict of the completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Pass,
    Incomplete,
}

/// Decide whether a result covers the study's post period.
///
/// Passes iff data was found and its latest date is on or after
/// `required_boundary`.
pub fn validate_completeness(result: &QueryResult, required_boundary: NaiveDate) -> Completeness {
    match result {
        QueryResult::Data(summary) if summary.latest_date >= required_boundary => {
            Completeness::Pass
        }
        _ => Completeness::Incomplete,
    }
}
