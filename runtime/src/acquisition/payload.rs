//! Decoding of articulation agreement bodies.
//!
//! The agreement endpoint serializes nested objects and arrays a second time
//! and embeds them as JSON strings, e.g. `{"result":{"articulations":"[{\"type\":...}]"}}`.
//! Sometimes the whole body is itself a quoted string. Decoding is done in two
//! passes: parse the outer document, then replace every string that holds a
//! JSON object or array with its parsed value, recursively. Ordinary strings
//! that merely contain braces stay untouched.

use serde::Deserialize;
use serde_json::Value;

/// Top-level agreement envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct AgreementEnvelope {
    pub result: AgreementResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgreementResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub articulations: Vec<ArticulationEntry>,
}

/// One receiving-side articulation rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub course: Option<ReceivingCourse>,
    #[serde(default)]
    pub sending_articulation: Option<SendingArticulation>,
}

/// The target-institution course an entry describes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingCourse {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub course_number: Option<String>,
}

/// Alternative equivalence groups on the sending side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendingArticulation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<EquivalenceGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquivalenceGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<SendingItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendingItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub course_number: Option<String>,
    #[serde(default)]
    pub course_title: Option<String>,
}

impl ArticulationEntry {
    pub fn is_course(&self) -> bool {
        self.kind.as_deref() == Some("Course")
    }

    /// `"<prefix> <number>"`, verbatim. Missing parts read as empty.
    pub fn target_course_id(&self) -> String {
        let course = self.course.as_ref();
        let prefix = course.and_then(|c| c.prefix.as_deref()).unwrap_or_default();
        let number = course
            .and_then(|c| c.course_number.as_deref())
            .unwrap_or_default();
        format!("{prefix} {number}")
    }

    /// The first equivalence group, the only one that is recorded.
    pub fn first_group(&self) -> Option<&EquivalenceGroup> {
        self.sending_articulation.as_ref()?.items.first()
    }
}

impl SendingItem {
    pub fn is_course(&self) -> bool {
        self.kind.as_deref() == Some("Course")
    }
}

/// Decode a raw agreement body.
pub fn decode_agreement(body: &str) -> Result<AgreementEnvelope, serde_json::Error> {
    serde_json::from_value(decode_nested(body)?)
}

/// Parse a document whose nested objects/arrays may be string-encoded.
pub fn decode_nested(body: &str) -> Result<Value, serde_json::Error> {
    let outer: Value = serde_json::from_str(body.trim())?;
    Ok(expand_embedded_json(outer))
}

/// Replace string-encoded objects and arrays with their parsed values.
pub fn expand_embedded_json(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_embedded(&s) {
            Some(inner) => expand_embedded_json(inner),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(expand_embedded_json).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key, expand_embedded_json(v)))
                .collect(),
        ),
        other => other,
    }
}

fn parse_embedded(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !bracketed {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
