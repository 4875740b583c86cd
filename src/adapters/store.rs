//! Persistence store adapter
//!
//! Parses subject rows as returned by the subject store and maps them to
//! canonical subject records. Rows written by older clients use French column
//! names for the reference fields (`pathologie`, `commentaire`).

use serde::Deserialize;
use serde_json::Value;

use crate::error::ScoreError;
use crate::schema::RawTrialPayload;
use crate::types::{SubjectPayload, SubjectRecord};

use super::{json_rows, value_to_age, value_to_text, value_to_timestamp, SubjectPayloadAdapter};

/// Subject store adapter
pub struct StoreAdapter;

impl SubjectPayloadAdapter for StoreAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<SubjectRecord>, ScoreError> {
        json_rows(raw_json)?
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let row: StoreRow = serde_json::from_value(row)?;
                convert_row(index, row)
            })
            .collect()
    }
}

fn convert_row(index: usize, row: StoreRow) -> Result<SubjectRecord, ScoreError> {
    let name = row.person_name.as_deref().and_then(|n| {
        let n = n.trim();
        (!n.is_empty()).then(|| n.to_string())
    });
    let id = row.id.as_ref().and_then(value_to_text).or_else(|| name.clone());
    let Some(id) = id else {
        return Err(ScoreError::MissingField(format!(
            "row {index} has neither id nor person_name"
        )));
    };

    let payload = match row.raw_data {
        None | Some(Value::Null) => SubjectPayload::Missing,
        Some(value) => match RawTrialPayload::from_value(value) {
            Ok(payload) => SubjectPayload::Present(payload),
            Err(e) => SubjectPayload::Malformed(e.to_string()),
        },
    };

    Ok(SubjectRecord {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        payload,
        age: row.age.as_ref().and_then(value_to_age),
        pathology: non_empty(row.pathology).or_else(|| non_empty(row.pathologie)),
        comment: non_empty(row.comment).or_else(|| non_empty(row.commentaire)),
        user_id: row.user_id.as_ref().and_then(value_to_text),
        started_at: row.start_time.as_ref().and_then(value_to_timestamp),
        ended_at: row.end_time.as_ref().and_then(value_to_timestamp),
    })
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

// Store row structure

#[derive(Debug, Deserialize)]
struct StoreRow {
    id: Option<Value>,
    person_name: Option<String>,
    raw_data: Option<Value>,
    pathology: Option<String>,
    pathologie: Option<String>,
    comment: Option<String>,
    commentaire: Option<String>,
    age: Option<Value>,
    user_id: Option<Value>,
    start_time: Option<Value>,
    end_time: Option<Value>,
}
