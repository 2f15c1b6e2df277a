//! Parsed query results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker the query service writes for a SQL NULL.
pub const NULL_SENTINEL: &str = "\\N";

const FIELD_COUNT: usize = 4;

/// Errors that can occur while parsing a result payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultParseError {
    #[error("expected {expected} tab-separated fields, found {found}")]
    WrongFieldCount { expected: usize, found: usize },

    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Transaction coverage for one provider over a study's date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Days in the queried period.
    pub day_count: i64,
    /// Days with at least one transaction.
    pub distinct_transaction_days: i64,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
}

/// Result of one completed remote query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    Data(TransactionSummary),
    /// The remote computation produced a null boundary: no data found.
    NoResult,
}

impl QueryResult {
    /// Latest observed transaction date, if any data was found.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        match self {
            QueryResult::Data(summary) => Some(summary.latest_date),
            QueryResult::NoResult => None,
        }
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, ResultParseError> {
    value.parse().map_err(|_| ResultParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ResultParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ResultParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Parse the raw tab-delimited payload of a finished query.
///
/// Any null field means the query found nothing and yields `NoResult`.
pub fn parse_result(raw: &str) -> Result<QueryResult, ResultParseError> {
    let fields: Vec<&str> = raw.trim().split('\t').map(str::trim).collect();

    if fields.iter().any(|f| *f == NULL_SENTINEL) {
        return Ok(QueryResult::NoResult);
    }

    if fields.len() != FIELD_COUNT {
        return Err(ResultParseError::WrongFieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    Ok(QueryResult::Data(TransactionSummary {
        day_count: parse_int("day_count", fields[0])?,
        distinct_transaction_days: parse_int("distinct_transaction_days", fields[1])?,
        earliest_date: parse_date("earliest_date", fields[2])?,
        latest_date: parse_date("latest_date", fields[3])?,
    }))
}
