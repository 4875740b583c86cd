//! Subject payload adapters
//!
//! This module provides adapters that parse raw subject rows from the places
//! test sessions are kept and map them to canonical subject records.

mod store;
mod upload;

pub use store::StoreAdapter;
pub use upload::UploadAdapter;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::ScoreError;
use crate::types::SubjectRecord;

/// Trait for subject payload adapters
pub trait SubjectPayloadAdapter {
    /// Parse raw JSON and convert to canonical subject records
    fn parse(&self, raw_json: &str) -> Result<Vec<SubjectRecord>, ScoreError>;
}

/// Rows of a JSON document that is either one object or an array of them
pub(crate) fn json_rows(raw_json: &str) -> Result<Vec<Value>, ScoreError> {
    let document: Value = serde_json::from_str(raw_json)?;
    match document {
        Value::Array(rows) => Ok(rows),
        row @ Value::Object(_) => Ok(vec![row]),
        _ => Err(ScoreError::ParseError(
            "expected an object or an array of objects".to_string(),
        )),
    }
}

/// Identifier-like value rendered as text (`42` and `"42"` are the same id)
pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Age in years from a number or a numeric string
pub(crate) fn value_to_age(value: &Value) -> Option<u32> {
    let years = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (years.is_finite() && years >= 0.0 && years <= u32::MAX as f64).then(|| years.trunc() as u32)
}

/// Timestamp from an RFC 3339 string or epoch milliseconds
pub(crate) fn value_to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_f64().and_then(millis_to_timestamp),
        _ => None,
    }
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    text.parse::<f64>().ok().and_then(millis_to_timestamp)
}

pub(crate) fn millis_to_timestamp(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis.trunc() as i64).single()
}
