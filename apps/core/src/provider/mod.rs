//! Outbound seam to the language-model provider.
//!
//! The gateway only knows "send text, receive text or an error". Concrete wire
//! protocols live behind [`CompletionProvider`]; [`http::HttpCompletionProvider`] is the
//! one shipped adapter.

pub mod http;

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpCompletionProvider;

/// One completion call. Prompts must already be de-identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Defines the public interface for a text-completion backend.
///
/// Implementations must not enforce their own deadline shorter than the gateway's;
/// the gateway bounds every call with the configured provider timeout.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Short provider name reported in result metadata (e.g. `openai`).
    fn name(&self) -> &str;

    /// Returns the raw model output text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;
}
