use super::intent::Intent;
use super::Role;

pub const GENERAL_DISCLAIMER: &str =
    "This is system guidance. Always follow your institution's clinical standards.";

pub const MEDICAL_DISCLAIMER: &str = "⚠ This assistant provides system guidance only and does not replace professional medical judgment. For medical advice, consult your healthcare provider.";

pub const PATIENT_MEDICAL_DISCLAIMER: &str = "⚠ I cannot provide medical advice. Please consult with your healthcare provider. I can help you book an appointment or access your medical records.";

/// Compliance text keyed by `(intent, role)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisclaimerPolicy;

impl DisclaimerPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn disclaimer_for(&self, intent: Intent, role: Role) -> &'static str {
        match (intent, role) {
            (Intent::MedicalQuestion, Role::Patient) => PATIENT_MEDICAL_DISCLAIMER,
            (Intent::MedicalQuestion, Role::Clinician | Role::Admin) => MEDICAL_DISCLAIMER,
            _ => GENERAL_DISCLAIMER,
        }
    }
}
