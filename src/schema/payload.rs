//! Flat trial payload schema
//!
//! A session is recorded as one flat JSON object. Design parameters live at
//! the top level (`rsbStart`, `rsbEnd`, `rsbStep`, `wordCnt`) and each trial
//! slot `i` is spread over computed keys:
//!
//! - `wordHist/{i}/word` - presented word
//! - `wordHist/{i}/resp` - transcribed response
//! - `wordHist/{i}/rsb` - noise level (dB)
//! - `wordHist/{i}/beginningOfSpeechTime` - start of speech (ms)
//! - `wordHist/{i}/endOfSpeechTime` - end of speech (ms)
//!
//! Values may be JSON numbers or numeric strings depending on the exporter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScoreError;
use crate::types::TestDesign;

/// Prefix shared by all trial slot keys
pub const SLOT_PREFIX: &str = "wordHist";

pub const FIELD_WORD: &str = "word";
pub const FIELD_RESPONSE: &str = "resp";
pub const FIELD_NOISE_LEVEL: &str = "rsb";
pub const FIELD_SPEECH_START: &str = "beginningOfSpeechTime";
pub const FIELD_SPEECH_END: &str = "endOfSpeechTime";

pub const DESIGN_NOISE_START: &str = "rsbStart";
pub const DESIGN_NOISE_END: &str = "rsbEnd";
pub const DESIGN_NOISE_STEP: &str = "rsbStep";
pub const DESIGN_WORD_COUNT: &str = "wordCnt";

/// Key of one field of one trial slot
pub fn slot_key(index: usize, field: &str) -> String {
    format!("{SLOT_PREFIX}/{index}/{field}")
}

/// Raw fields of one trial slot, before any plausibility check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSlot<'a> {
    pub index: usize,
    pub word: Option<&'a str>,
    pub response: Option<&'a str>,
    pub noise_level: Option<f64>,
    pub speech_start: Option<f64>,
    pub speech_end: Option<f64>,
}

/// One subject's flat trial payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTrialPayload {
    fields: Map<String, Value>,
}

impl RawTrialPayload {
    /// Build a payload from a JSON value
    ///
    /// Stores sometimes keep the payload as a JSON-encoded string, so a string
    /// holding an object is accepted too.
    pub fn from_value(value: Value) -> Result<Self, ScoreError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            Value::String(encoded) => Self::from_json_str(&encoded),
            other => Err(ScoreError::ParseError(format!(
                "trial payload must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse a payload from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ScoreError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ScoreError::ParseError(format!(
                "trial payload must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Non-empty string value
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Finite numeric value, from a number or a numeric string
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(value_as_f64)
    }

    /// Integer value, truncating fractional numbers
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.number(key).map(|n| n.trunc() as i64)
    }

    /// First non-empty string among alternate keys
    pub fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.text(key))
    }

    /// First integer among alternate keys
    pub fn first_integer(&self, keys: &[&str]) -> Option<i64> {
        keys.iter().find_map(|key| self.integer(key))
    }

    /// Test design declared by the payload, field by field over `defaults`
    pub fn design(&self, defaults: &TestDesign) -> TestDesign {
        TestDesign {
            noise_start: self
                .integer(DESIGN_NOISE_START)
                .unwrap_or(defaults.noise_start),
            noise_end: self.integer(DESIGN_NOISE_END).unwrap_or(defaults.noise_end),
            noise_step: self
                .integer(DESIGN_NOISE_STEP)
                .unwrap_or(defaults.noise_step),
            words_per_level: self
                .integer(DESIGN_WORD_COUNT)
                .unwrap_or(defaults.words_per_level),
        }
    }

    /// Raw fields of trial slot `index`
    pub fn slot(&self, index: usize) -> RawSlot<'_> {
        RawSlot {
            index,
            word: self.text(&slot_key(index, FIELD_WORD)),
            response: self.text(&slot_key(index, FIELD_RESPONSE)),
            noise_level: self.number(&slot_key(index, FIELD_NOISE_LEVEL)),
            speech_start: self.number(&slot_key(index, FIELD_SPEECH_START)),
            speech_end: self.number(&slot_key(index, FIELD_SPEECH_END)),
        }
    }

    /// Earliest speech start and latest speech end over every slot present
    pub fn speech_time_bounds(&self) -> Option<(f64, f64)> {
        let timestamps: Vec<f64> = self
            .fields
            .iter()
            .filter(|(key, _)| {
                key.starts_with(SLOT_PREFIX)
                    && (key.ends_with(FIELD_SPEECH_START) || key.ends_with(FIELD_SPEECH_END))
            })
            .filter_map(|(_, value)| value_as_f64(value))
            .collect();

        let min = timestamps.iter().copied().reduce(f64::min)?;
        let max = timestamps.iter().copied().reduce(f64::max)?;
        Some((min, max))
    }
}

impl From<Map<String, Value>> for RawTrialPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RawTrialPayload {
        RawTrialPayload::from_value(value).unwrap()
    }

    #[test]
    fn test_slot_key_format() {
        assert_eq!(slot_key(12, FIELD_RESPONSE), "wordHist/12/resp");
    }

    #[test]
    fn test_numbers_and_numeric_strings() {
        let p = payload(json!({
            "a": 12.5,
            "b": " -4 ",
            "c": "abc",
            "d": "",
            "e": null,
            "f": "NaN",
            "g": "inf"
        }));
        assert_eq!(p.number("a"), Some(12.5));
        assert_eq!(p.number("b"), Some(-4.0));
        assert_eq!(p.number("c"), None);
        assert_eq!(p.number("d"), None);
        assert_eq!(p.number("e"), None);
        assert_eq!(p.number("f"), None);
        assert_eq!(p.number("g"), None);
        assert_eq!(p.number("missing"), None);
    }

    #[test]
    fn test_integer_truncates() {
        let p = payload(json!({"step": "-2.7", "count": 4.9}));
        assert_eq!(p.integer("step"), Some(-2));
        assert_eq!(p.integer("count"), Some(4));
    }

    #[test]
    fn test_text_requires_non_empty_string() {
        let p = payload(json!({"w": "chat", "empty": "", "num": 3}));
        assert_eq!(p.text("w"), Some("chat"));
        assert_eq!(p.text("empty"), None);
        assert_eq!(p.text("num"), None);
        assert_eq!(p.first_text(&["empty", "num", "w"]), Some("chat"));
    }

    #[test]
    fn test_design_falls_back_per_field() {
        let p = payload(json!({"rsbStart": "6", "rsbStep": 2, "rsbEnd": "oops"}));
        let design = p.design(&TestDesign::default());
        assert_eq!(design.noise_start, 6);
        assert_eq!(design.noise_step, 2);
        assert_eq!(design.noise_end, -14);
        assert_eq!(design.words_per_level, 4);
    }

    #[test]
    fn test_slot_extraction() {
        let p = payload(json!({
            "wordHist/0/word": "pomme",
            "wordHist/0/resp": "une pomme",
            "wordHist/0/rsb": "-4",
            "wordHist/0/beginningOfSpeechTime": 1000,
            "wordHist/0/endOfSpeechTime": "1600"
        }));
        let slot = p.slot(0);
        assert_eq!(slot.word, Some("pomme"));
        assert_eq!(slot.response, Some("une pomme"));
        assert_eq!(slot.noise_level, Some(-4.0));
        assert_eq!(slot.speech_start, Some(1000.0));
        assert_eq!(slot.speech_end, Some(1600.0));

        let empty = p.slot(1);
        assert_eq!(empty.word, None);
        assert_eq!(empty.noise_level, None);
    }

    #[test]
    fn test_string_encoded_payload() {
        let p = RawTrialPayload::from_value(json!("{\"rsbStart\": 2}")).unwrap();
        assert_eq!(p.integer("rsbStart"), Some(2));

        assert!(RawTrialPayload::from_value(json!([1, 2])).is_err());
        assert!(RawTrialPayload::from_value(json!("not json")).is_err());
    }

    #[test]
    fn test_speech_time_bounds() {
        let p = payload(json!({
            "wordHist/0/beginningOfSpeechTime": 5000,
            "wordHist/0/endOfSpeechTime": 5600,
            "wordHist/7/beginningOfSpeechTime": "1200",
            "wordHist/7/endOfSpeechTime": 9000,
            "rsbStart": 0
        }));
        assert_eq!(p.speech_time_bounds(), Some((1200.0, 9000.0)));
        assert_eq!(payload(json!({})).speech_time_bounds(), None);
    }
}
