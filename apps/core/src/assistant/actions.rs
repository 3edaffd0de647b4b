//! Navigation suggestions derived from the assistant's own reply text.

use super::Role;
use serde::{Deserialize, Serialize};

pub const MAX_SUGGESTED_ACTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAction {
    pub label: String,
    pub action_type: String,
    pub target: String,
}

impl SuggestedAction {
    pub fn navigate(label: &str, target: &str) -> Self {
        Self {
            label: label.to_string(),
            action_type: "navigate".to_string(),
            target: target.to_string(),
        }
    }
}

/// Role-specific navigation targets.
struct RouteTable {
    records: (&'static str, &'static str),
    appointments: (&'static str, &'static str),
    doctors: Option<(&'static str, &'static str)>,
}

const CLINICIAN_ROUTES: RouteTable = RouteTable {
    records: ("Patient Records", "/patient-records"),
    appointments: ("Manage Appointments", "/appointments"),
    doctors: None,
};

const PATIENT_ROUTES: RouteTable = RouteTable {
    records: ("My Medical Records", "/medical-records"),
    appointments: ("Book an Appointment", "/book-appointment"),
    doctors: Some(("View My Doctors", "/my-doctors")),
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionRecommender;

impl ActionRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Scans `reply` (not the user's message) for navigation cues. At most three
    /// actions, in records, appointments, doctors order. Admins get none.
    pub fn recommend(&self, reply: &str, role: Role) -> Vec<SuggestedAction> {
        let routes = match role {
            Role::Clinician => &CLINICIAN_ROUTES,
            Role::Patient => &PATIENT_ROUTES,
            Role::Admin => return Vec::new(),
        };
        let lowered = reply.to_lowercase();
        let mut actions = Vec::new();

        if lowered.contains("patient record") || lowered.contains("medical record") {
            let (label, target) = routes.records;
            actions.push(SuggestedAction::navigate(label, target));
        }

        if lowered.contains("appointment")
            && ["book", "schedule", "manage"].iter().any(|w| lowered.contains(w))
        {
            let (label, target) = routes.appointments;
            actions.push(SuggestedAction::navigate(label, target));
        }

        if let Some((label, target)) = routes.doctors {
            if lowered.contains("doctor") {
                actions.push(SuggestedAction::navigate(label, target));
            }
        }

        actions.truncate(MAX_SUGGESTED_ACTIONS);
        actions
    }

    /// Fixed redirect offered to patients who ask a medical question.
    pub fn medical_redirect(&self, role: Role) -> Vec<SuggestedAction> {
        match role {
            Role::Patient => vec![
                SuggestedAction::navigate("Book an Appointment", "/book-appointment"),
                SuggestedAction::navigate("View My Medical Records", "/medical-records"),
            ],
            Role::Clinician | Role::Admin => Vec::new(),
        }
    }
}
