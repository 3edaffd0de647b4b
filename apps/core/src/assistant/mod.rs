//! Role-aware guided assistant.
//!
//! A chat turn is a pure function of the request: classify, pick the canned reply,
//! derive navigation actions from that reply and attach the disclaimer. Conversation
//! history is owned by the caller.

pub mod actions;
pub mod disclaimer;
pub mod intent;
pub mod replies;

use crate::config::{MAX_MESSAGE_LENGTH, MIN_MESSAGE_LENGTH};
use crate::error::AppError;
use crate::validation::{require_id, validate_bounded_text};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub use actions::{ActionRecommender, SuggestedAction};
pub use disclaimer::DisclaimerPolicy;
pub use intent::{Intent, IntentClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Clinician,
    Patient,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Clinician => "clinician",
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clinician" => Ok(Role::Clinician),
            "patient" => Ok(Role::Patient),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Inbound chat turn. `role` is kept as received and parsed during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub role: String,
    pub message: String,
    pub conversation_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub intent: Intent,
    pub suggested_actions: Vec<SuggestedAction>,
    pub disclaimer: String,
}

pub fn validate_message(message: &str) -> Result<(), AppError> {
    validate_bounded_text(message, MIN_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH, "Message")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatAssistant {
    classifier: IntentClassifier,
    recommender: ActionRecommender,
    disclaimers: DisclaimerPolicy,
}

impl ChatAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the request, then answers it. Returns the parsed role with the reply.
    pub fn respond(&self, request: &ChatRequest) -> Result<(Role, ChatReply), AppError> {
        require_id(&request.user_id, "userId")?;
        require_id(&request.conversation_id, "conversationId")?;
        validate_message(&request.message)?;
        let role: Role = request.role.parse()?;
        Ok((role, self.answer(&request.message, role)))
    }

    pub fn answer(&self, message: &str, role: Role) -> ChatReply {
        let intent = self.classifier.classify(message, role);
        debug!(%role, %intent, "Intent classified");

        let reply = replies::reply_for(intent, role);
        let suggested_actions = if intent == Intent::MedicalQuestion {
            self.recommender.medical_redirect(role)
        } else {
            self.recommender.recommend(reply, role)
        };

        ChatReply {
            reply: reply.to_string(),
            intent,
            suggested_actions,
            disclaimer: self.disclaimers.disclaimer_for(intent, role).to_string(),
        }
    }
}
