use crate::config::{GatewayConfig, ProviderKind};
use crate::error::AppError;
use crate::provider::{CompletionProvider, CompletionRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Error bodies are truncated before they reach an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTPS adapter for OpenAI-compatible and Anthropic completion APIs.
#[derive(Clone)]
pub struct HttpCompletionProvider {
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpCompletionProvider {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Fails with `Unavailable` when no API key is configured.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, AppError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Unavailable("AI_API_KEY not configured".to_string()))?;
        Ok(Self::new(config.provider, config.base_url(), api_key))
    }

    fn endpoint(&self) -> String {
        match self.kind {
            ProviderKind::OpenAi => format!("{}/v1/chat/completions", self.base_url),
            ProviderKind::Anthropic => format!("{}/v1/messages", self.base_url),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> reqwest::RequestBuilder {
        match self.kind {
            ProviderKind::OpenAi => {
                let payload = json!({
                    "model": request.model,
                    "messages": [
                        { "role": "system", "content": request.system_prompt },
                        { "role": "user", "content": request.user_prompt },
                    ],
                    "temperature": request.temperature,
                    "max_tokens": request.max_tokens,
                    "response_format": { "type": "json_object" },
                });
                self.client
                    .post(self.endpoint())
                    .bearer_auth(&self.api_key)
                    .json(&payload)
            }
            ProviderKind::Anthropic => {
                let payload = json!({
                    "model": request.model,
                    "system": request.system_prompt,
                    "messages": [
                        { "role": "user", "content": request.user_prompt },
                    ],
                    "temperature": request.temperature,
                    "max_tokens": request.max_tokens,
                });
                self.client
                    .post(self.endpoint())
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&payload)
            }
        }
    }

    fn extract_content(&self, body: &Value) -> Option<String> {
        match self.kind {
            ProviderKind::OpenAi => body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string),
            ProviderKind::Anthropic => body["content"].as_array().and_then(|blocks| {
                blocks
                    .iter()
                    .find(|block| block["type"] == "text")
                    .and_then(|block| block["text"].as_str())
                    .map(str::to_string)
            }),
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        debug!(
            provider = %self.kind,
            model = %request.model,
            prompt_chars = request.user_prompt.chars().count(),
            "Sending completion request"
        );

        let res = self.build_request(&request).send().await?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            error!(provider = %self.kind, %status, "Completion request failed");
            return Err(AppError::Provider(format!(
                "Completion request failed with status {}: {}",
                status, body
            )));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid response envelope: {}", e)))?;

        self.extract_content(&json).ok_or_else(|| {
            AppError::Provider("Completion response contained no text content".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::prompt::interpretation_request;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_openai_completion_success() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let provider = HttpCompletionProvider::new(ProviderKind::OpenAi, mock_server.uri(), "sk-test");

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"formatted\":\"f\"}" } }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = provider
            .complete(interpretation_request("Pt with cough", "gpt-4o"))
            .await;

        // 3. Assert
        assert_eq!(result.unwrap(), "{\"formatted\":\"f\"}");
    }

    #[tokio::test]
    async fn test_anthropic_completion_success() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let provider =
            HttpCompletionProvider::new(ProviderKind::Anthropic, format!("{}/", mock_server.uri()), "ak-test");

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "interpreted" }]
            })))
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = provider
            .complete(interpretation_request("Pt with cough", "claude"))
            .await;

        // 3. Assert
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(result.unwrap(), "interpreted");
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let provider = HttpCompletionProvider::new(ProviderKind::OpenAi, mock_server.uri(), "sk-test");

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = provider
            .complete(interpretation_request("Pt with cough", "gpt-4o"))
            .await;

        // 3. Assert
        match result {
            Err(AppError::Provider(msg)) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("Service Unavailable"));
            }
            other => panic!("Expected AppError::Provider, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_provider_error() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        let provider = HttpCompletionProvider::new(ProviderKind::OpenAi, mock_server.uri(), "sk-test");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        // 2. Act
        let result = provider
            .complete(interpretation_request("Pt with cough", "gpt-4o"))
            .await;

        // 3. Assert
        assert!(matches!(result, Err(AppError::Provider(_))));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = GatewayConfig::default();
        assert!(matches!(
            HttpCompletionProvider::from_config(&config),
            Err(AppError::Unavailable(_))
        ));
    }
}
