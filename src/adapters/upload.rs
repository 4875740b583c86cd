//! Uploaded file adapter
//!
//! An uploaded session file holds rows whose columns are the flat payload
//! keys. Only the first row describes the session; the subject is named after
//! the file. Subject metadata is read from whichever alternate column the
//! exporting app used.

use serde_json::Value;

use crate::error::ScoreError;
use crate::schema::RawTrialPayload;
use crate::types::{SubjectPayload, SubjectRecord};

use super::{
    json_rows, millis_to_timestamp, value_to_age, value_to_text, value_to_timestamp,
    SubjectPayloadAdapter,
};

const AGE_KEYS: &[&str] = &["userAge", "age", "age_participant", "participant_age"];
const USER_ID_KEYS: &[&str] = &["userId", "user_id", "userID"];
const START_KEYS: &[&str] = &["start_time", "startTime", "beginningTime"];
const END_KEYS: &[&str] = &["end_time", "endTime", "finishTime"];

/// Uploaded session file adapter
pub struct UploadAdapter {
    file_name: String,
}

impl UploadAdapter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl SubjectPayloadAdapter for UploadAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<SubjectRecord>, ScoreError> {
        let Some(first) = json_rows(raw_json)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let payload = RawTrialPayload::from_value(first)?;

        let age = first_value(&payload, AGE_KEYS, value_to_age);
        let user_id = first_value(&payload, USER_ID_KEYS, value_to_text)
            .unwrap_or_else(|| self.file_name.to_lowercase());

        let mut started_at = first_value(&payload, START_KEYS, value_to_timestamp);
        let mut ended_at = first_value(&payload, END_KEYS, value_to_timestamp);
        if started_at.is_none() || ended_at.is_none() {
            if let Some((first_ms, last_ms)) = payload.speech_time_bounds() {
                started_at = started_at.or_else(|| millis_to_timestamp(first_ms));
                ended_at = ended_at.or_else(|| millis_to_timestamp(last_ms));
            }
        }

        Ok(vec![SubjectRecord {
            id: self.file_name.clone(),
            name: self.file_name.clone(),
            payload: SubjectPayload::Present(payload),
            age,
            pathology: None,
            comment: None,
            user_id: Some(user_id),
            started_at,
            ended_at,
        }])
    }
}

fn first_value<T>(
    payload: &RawTrialPayload,
    keys: &[&str],
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .find_map(|key| payload.get(key).and_then(&convert))
}
