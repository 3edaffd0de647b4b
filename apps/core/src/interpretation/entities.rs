//! Keyword and regex entity mining over interpreted notes.
//!
//! This is a heuristic: plain substring presence for symptoms, diagnoses and
//! medications, and one first-match regex per vital sign. A note that mentions
//! the same vital twice keeps only the first reading.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use super::parser::ParsedInterpretation;

pub const SYMPTOM_KEYWORDS: &[&str] = &[
    "cough",
    "fever",
    "pain",
    "headache",
    "nausea",
    "dyspnea",
    "chest pain",
    "shortness of breath",
];

pub const DIAGNOSIS_KEYWORDS: &[&str] = &[
    "pneumonia",
    "bronchitis",
    "asthma",
    "diabetes",
    "hypertension",
    "uri",
    "viral",
];

/// Fixed vital-sign vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Vital {
    #[serde(rename = "SpO2")]
    SpO2,
    #[serde(rename = "BP")]
    Bp,
    #[serde(rename = "HR")]
    Hr,
}

impl Vital {
    pub fn label(&self) -> &'static str {
        match self {
            Vital::SpO2 => "SpO2",
            Vital::Bp => "BP",
            Vital::Hr => "HR",
        }
    }
}

impl fmt::Display for Vital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Matched against lower-cased text.
static VITAL_PATTERNS: LazyLock<Vec<(Vital, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Vital::SpO2,
            Regex::new(r"spo2[:\s]+(\d+%?)").expect("Invalid regex: SpO2 pattern"),
        ),
        (
            Vital::Bp,
            Regex::new(r"bp[:\s]*(\d+/\d+)").expect("Invalid regex: BP pattern"),
        ),
        (
            Vital::Hr,
            Regex::new(r"hr[:\s]*(\d+)").expect("Invalid regex: HR pattern"),
        ),
    ]
});

/// Entities found in one interpretation. Sets are deduplicated; order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub symptoms: BTreeSet<String>,
    pub diagnoses: BTreeSet<String>,
    pub medications: BTreeSet<String>,
    pub vitals: BTreeMap<Vital, String>,
}

/// Keyword lists the extractor matches against. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityVocabulary {
    pub symptoms: Vec<String>,
    pub diagnoses: Vec<String>,
    /// Empty by default: no medication list ships with the core.
    pub medications: Vec<String>,
}

impl Default for EntityVocabulary {
    fn default() -> Self {
        Self {
            symptoms: SYMPTOM_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            diagnoses: DIAGNOSIS_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            medications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityExtractor {
    vocabulary: EntityVocabulary,
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keywords are lower-cased here to match the lower-cased note text.
    pub fn with_vocabulary(vocabulary: EntityVocabulary) -> Self {
        let lower = |words: Vec<String>| -> Vec<String> {
            words.into_iter().map(|w| w.trim().to_lowercase()).collect()
        };
        Self {
            vocabulary: EntityVocabulary {
                symptoms: lower(vocabulary.symptoms),
                diagnoses: lower(vocabulary.diagnoses),
                medications: lower(vocabulary.medications),
            },
        }
    }

    pub fn extract(&self, parsed: &ParsedInterpretation) -> EntitySet {
        self.extract_text(&parsed.combined_text())
    }

    pub fn extract_text(&self, text: &str) -> EntitySet {
        let lowered = text.to_lowercase();

        let present = |keywords: &[String]| -> BTreeSet<String> {
            keywords
                .iter()
                .filter(|kw| lowered.contains(kw.as_str()))
                .cloned()
                .collect()
        };

        let vitals = VITAL_PATTERNS
            .iter()
            .filter_map(|(vital, pattern)| {
                pattern
                    .captures(&lowered)
                    .and_then(|caps| caps.get(1))
                    .map(|value| (*vital, value.as_str().to_string()))
            })
            .collect();

        EntitySet {
            symptoms: present(&self.vocabulary.symptoms),
            diagnoses: present(&self.vocabulary.diagnoses),
            medications: present(&self.vocabulary.medications),
            vitals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symptoms_and_diagnoses_from_all_fields() {
        let parsed = ParsedInterpretation {
            formatted: "Chief complaint: persistent COUGH".into(),
            clinical: "No fever. Likely viral bronchitis.".into(),
            patient_friendly: "You have a cough.".into(),
        };
        let entities = EntityExtractor::new().extract(&parsed);

        assert!(entities.symptoms.contains("cough"));
        assert!(entities.symptoms.contains("fever"));
        assert!(entities.diagnoses.contains("viral"));
        assert!(entities.diagnoses.contains("bronchitis"));
        assert_eq!(entities.symptoms.iter().filter(|s| *s == "cough").count(), 1);
        assert!(entities.medications.is_empty());
    }

    #[test]
    fn test_host_vocabulary_matches_regardless_of_case() {
        let vocabulary = EntityVocabulary {
            medications: vec!["Amoxicillin".to_string(), " IBUPROFEN ".to_string()],
            ..EntityVocabulary::default()
        };
        let entities = EntityExtractor::with_vocabulary(vocabulary)
            .extract_text("Started amoxicillin 500mg; Ibuprofen as needed for pain.");

        assert!(entities.medications.contains("amoxicillin"));
        assert!(entities.medications.contains("ibuprofen"));
        assert!(entities.symptoms.contains("pain"));
    }

    #[test]
    fn test_vitals_first_match_wins() {
        let entities = EntityExtractor::new()
            .extract_text("SpO2: 98% on RA. BP 120/80, later BP 140/90. HR: 72");
        assert_eq!(entities.vitals.get(&Vital::SpO2).map(String::as_str), Some("98%"));
        assert_eq!(entities.vitals.get(&Vital::Bp).map(String::as_str), Some("120/80"));
        assert_eq!(entities.vitals.get(&Vital::Hr).map(String::as_str), Some("72"));
    }

    #[test]
    fn test_no_entities_yields_empty_collections() {
        let entities = EntityExtractor::new().extract_text("Routine follow-up, all well.");
        assert_eq!(entities, EntitySet::default());

        let json = serde_json::to_value(&entities).unwrap();
        for key in ["symptoms", "diagnoses", "medications", "vitals"] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_vital_keys_serialize_with_fixed_names() {
        let entities = EntityExtractor::new().extract_text("spo2 95 bp:110/70");
        let json = serde_json::to_value(&entities).unwrap();
        assert_eq!(json["vitals"]["SpO2"], "95");
        assert_eq!(json["vitals"]["BP"], "110/70");
    }

    #[test]
    fn test_custom_medication_vocabulary() {
        let vocabulary = EntityVocabulary {
            medications: vec!["amoxicillin".into(), "albuterol".into()],
            ..EntityVocabulary::default()
        };
        let entities = EntityExtractor::with_vocabulary(vocabulary)
            .extract_text("Started Amoxicillin 500mg TID.");
        assert_eq!(
            entities.medications.into_iter().collect::<Vec<_>>(),
            vec!["amoxicillin".to_string()]
        );
    }
}
