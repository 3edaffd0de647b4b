//! Tolerant parser for the provider's structured reply.
//!
//! The provider is asked for `{"formatted", "clinical", "patientFriendly"}`. Anything
//! else degrades gracefully: missing fields become empty strings with a warning, and
//! text that is not a JSON object is used verbatim for all three fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// The three renderings of an interpreted note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInterpretation {
    pub formatted: String,
    pub clinical: String,
    pub patient_friendly: String,
}

impl ParsedInterpretation {
    fn uniform(text: &str) -> Self {
        Self {
            formatted: text.to_string(),
            clinical: text.to_string(),
            patient_friendly: text.to_string(),
        }
    }

    /// The text entity extraction runs over: all three fields, space-joined.
    pub fn combined_text(&self) -> String {
        [
            self.formatted.as_str(),
            self.clinical.as_str(),
            self.patient_friendly.as_str(),
        ]
        .join(" ")
    }
}

/// Non-fatal: the reply could not be used as structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseDegradation {
    /// Not parseable as JSON at all.
    MalformedJson,
    /// Valid JSON, but not an object.
    NotAnObject,
}

/// Non-fatal per-field problems in an otherwise usable reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "field", rename_all = "snake_case")]
pub enum ParseWarning {
    MissingField(String),
    NonStringField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub interpretation: ParsedInterpretation,
    pub degradation: Option<ParseDegradation>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Never fails. See the module docs for the fallback rules.
    pub fn parse(&self, raw: &str) -> ParseOutcome {
        let object = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Self::fallback(raw, ParseDegradation::NotAnObject),
            Err(_) => return Self::fallback(raw, ParseDegradation::MalformedJson),
        };

        let mut warnings = Vec::new();
        let formatted = take_field(&object, &["formatted"], &mut warnings);
        let clinical = take_field(&object, &["clinical"], &mut warnings);
        let patient_friendly =
            take_field(&object, &["patientFriendly", "patient_friendly"], &mut warnings);

        ParseOutcome {
            interpretation: ParsedInterpretation {
                formatted,
                clinical,
                patient_friendly,
            },
            degradation: None,
            warnings,
        }
    }

    fn fallback(raw: &str, degradation: ParseDegradation) -> ParseOutcome {
        warn!(
            ?degradation,
            response_length = raw.len(),
            "Could not parse AI response as a JSON object, treating as plain text"
        );
        ParseOutcome {
            interpretation: ParsedInterpretation::uniform(raw),
            degradation: Some(degradation),
            warnings: Vec::new(),
        }
    }
}

/// First present key wins; `names[0]` is the canonical name used in warnings.
fn take_field(object: &Map<String, Value>, names: &[&str], warnings: &mut Vec<ParseWarning>) -> String {
    let canonical = names[0].to_string();
    match names.iter().find_map(|name| object.get(*name)) {
        Some(Value::String(text)) => text.clone(),
        Some(_) => {
            warn!(field = %canonical, "Non-string field in AI response");
            warnings.push(ParseWarning::NonStringField(canonical));
            String::new()
        }
        None => {
            warn!(field = %canonical, "Missing key in AI response");
            warnings.push(ParseWarning::MissingField(canonical));
            String::new()
        }
    }
}
