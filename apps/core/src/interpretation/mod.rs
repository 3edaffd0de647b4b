//! Clinical note interpretation: request/result types, response parsing and
//! entity extraction.

pub mod entities;
pub mod parser;
pub mod prompt;

use crate::config::{MAX_NOTE_LENGTH, MIN_NOTE_LENGTH};
use crate::error::AppError;
use crate::validation::{decode_utf8, require_id, validate_bounded_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use entities::{EntityExtractor, EntitySet, EntityVocabulary, Vital};
pub use parser::{ParseDegradation, ParseOutcome, ParseWarning, ParsedInterpretation, ResponseParser};

/// Inbound note interpretation request from the routing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub note_id: String,
    pub raw_note_text: String,
    pub patient_id: String,
    pub doctor_id: String,
}

impl NoteRequest {
    /// Builds a request from raw transport bytes, rejecting invalid UTF-8.
    pub fn from_bytes(
        note_id: impl Into<String>,
        raw_note: Vec<u8>,
        patient_id: impl Into<String>,
        doctor_id: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            note_id: note_id.into(),
            raw_note_text: decode_utf8(raw_note, "Note")?,
            patient_id: patient_id.into(),
            doctor_id: doctor_id.into(),
        })
    }

    /// Ids first, then the note text.
    pub fn validate(&self) -> Result<(), AppError> {
        require_id(&self.note_id, "noteId")?;
        require_id(&self.patient_id, "patientId")?;
        require_id(&self.doctor_id, "doctorId")?;
        validate_note(&self.raw_note_text)
    }
}

pub fn validate_note(text: &str) -> Result<(), AppError> {
    validate_bounded_text(text, MIN_NOTE_LENGTH, MAX_NOTE_LENGTH, "Note")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationMetadata {
    pub model_version: String,
    pub provider: String,
    #[serde(rename = "timestampUTC")]
    pub timestamp_utc: DateTime<Utc>,
    pub latency_ms: u64,
}

/// Structured outcome handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationResult {
    pub note_id: String,
    pub formatted: String,
    pub clinical: String,
    pub patient_friendly: String,
    pub entities: EntitySet,
    pub metadata: InterpretationMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_degradation: Option<ParseDegradation>,
    #[serde(default)]
    pub warnings: Vec<ParseWarning>,
    pub rate_limit_remaining: usize,
}

impl InterpretationResult {
    pub fn assemble(
        note_id: String,
        outcome: ParseOutcome,
        entities: EntitySet,
        metadata: InterpretationMetadata,
        rate_limit_remaining: usize,
    ) -> Self {
        let ParseOutcome {
            interpretation,
            degradation,
            warnings,
        } = outcome;
        Self {
            note_id,
            formatted: interpretation.formatted,
            clinical: interpretation.clinical,
            patient_friendly: interpretation.patient_friendly,
            entities,
            metadata,
            parse_degradation: degradation,
            warnings,
            rate_limit_remaining,
        }
    }
}
