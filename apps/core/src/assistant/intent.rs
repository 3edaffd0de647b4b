//! Keyword-priority intent classification for the guided assistant.
//!
//! Plain lower-cased substring matching: no model, no scoring. A message that
//! matches several buckets resolves to the first bucket listed for the role.

use super::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detected purpose of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Asks for diagnosis, treatment or interpretation. Redirected, never answered.
    MedicalQuestion,
    Documentation,
    Appointments,
    Records,
    SystemHelp,
    AppointmentBooking,
    RecordsAccess,
    Faq,
    GeneralQuestion,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::MedicalQuestion => "medical_question",
            Intent::Documentation => "documentation",
            Intent::Appointments => "appointments",
            Intent::Records => "records",
            Intent::SystemHelp => "system_help",
            Intent::AppointmentBooking => "appointment_booking",
            Intent::RecordsAccess => "records_access",
            Intent::Faq => "faq",
            Intent::GeneralQuestion => "general_question",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Checked for every role before any role bucket.
pub const MEDICAL_KEYWORDS: &[&str] = &[
    "diagnose",
    "diagnosis",
    "treatment",
    "should i",
    "what disease",
    "what condition",
    "am i sick",
    "should i see a doctor for",
    "do i have",
    "interpret",
    "lab values",
    "test results",
    "prescribe",
    "medication for",
    "is this normal",
];

const CLINICIAN_BUCKETS: &[(Intent, &[&str])] = &[
    (Intent::Documentation, &["note", "document", "add", "record"]),
    (Intent::Appointments, &["appointment", "schedule", "meeting"]),
    (Intent::Records, &["patient", "record", "history", "access"]),
    (Intent::SystemHelp, &["how", "where", "what"]),
];

const PATIENT_BUCKETS: &[(Intent, &[&str])] = &[
    (Intent::AppointmentBooking, &["book", "appointment", "schedule", "doctor"]),
    (Intent::RecordsAccess, &["record", "result", "test", "history", "view"]),
    (Intent::Faq, &["how", "what", "where", "how to use"]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, message: &str, role: Role) -> Intent {
        let lowered = message.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| lowered.contains(kw));

        if contains_any(MEDICAL_KEYWORDS) {
            return Intent::MedicalQuestion;
        }

        let buckets: &[(Intent, &[&str])] = match role {
            Role::Clinician => CLINICIAN_BUCKETS,
            Role::Patient => PATIENT_BUCKETS,
            Role::Admin => &[],
        };

        buckets
            .iter()
            .find(|(_, keywords)| contains_any(keywords))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::GeneralQuestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str, role: Role) -> Intent {
        IntentClassifier::new().classify(message, role)
    }

    #[test]
    fn test_medical_question_wins_for_every_role() {
        for role in [Role::Clinician, Role::Patient, Role::Admin] {
            assert_eq!(classify("What disease do I have?", role), Intent::MedicalQuestion);
        }
        assert_eq!(classify("Is this normal for a fever?", Role::Patient), Intent::MedicalQuestion);
    }

    #[test]
    fn test_patient_buckets() {
        assert_eq!(
            classify("How do I book an appointment?", Role::Patient),
            Intent::AppointmentBooking
        );
        assert_eq!(classify("Where can I view my history", Role::Patient), Intent::RecordsAccess);
        assert_eq!(classify("What is Afyaclick?", Role::Patient), Intent::Faq);
        assert_eq!(classify("Hello there", Role::Patient), Intent::GeneralQuestion);
    }

    #[test]
    fn test_clinician_priority_order() {
        // "record" sits in both documentation and records; documentation is listed first.
        assert_eq!(
            classify("How do I add a note to a patient record?", Role::Clinician),
            Intent::Documentation
        );
        assert_eq!(classify("Schedule a meeting", Role::Clinician), Intent::Appointments);
        assert_eq!(classify("Patient history please", Role::Clinician), Intent::Records);
        assert_eq!(classify("Where are settings?", Role::Clinician), Intent::SystemHelp);
        assert_eq!(classify("Thanks!", Role::Clinician), Intent::GeneralQuestion);
    }

    #[test]
    fn test_admin_only_gets_medical_check() {
        assert_eq!(classify("How do I add a user?", Role::Admin), Intent::GeneralQuestion);
    }

    #[test]
    fn test_intent_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Intent::AppointmentBooking).unwrap(),
            "\"appointment_booking\""
        );
        assert_eq!(Intent::SystemHelp.to_string(), "system_help");
    }
}
