//! Gateway configuration.
//!
//! A `GatewayConfig` is built once (from the environment or by hand in tests) and
//! passed into every component constructor. Nothing in the crate reads the
//! environment after startup.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

// --- Constants ---
pub const DEFAULT_MODEL_VERSION: &str = "gpt-4-turbo-2024-04";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;
pub const MIN_PROVIDER_TIMEOUT_SECS: u64 = 5;
pub const MAX_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_REQUESTS_PER_HOUR: usize = 10;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_TIMEOUT_SECS: u64 = 300;
/// 30 days. Larger windows overflow timestamp arithmetic.
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 2_592_000;
/// 1 day.
pub const MAX_BREAKER_TIMEOUT_SECS: u64 = 86_400;

pub const MIN_NOTE_LENGTH: usize = 20;
pub const MAX_NOTE_LENGTH: usize = 5000;
pub const MIN_MESSAGE_LENGTH: usize = 3;
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Supported upstream model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(AppError::Config(format!("Invalid AI_PROVIDER: {}", other))),
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" | "bunyan" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
        }
    }
}

/// Complete configuration of the gateway core.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    pub provider: ProviderKind,
    /// Credentials for the provider. `None` disables AI features.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[validate(length(min = 1))]
    pub model_version: String,
    /// Overrides the provider's public endpoint (proxies, tests).
    pub api_base_url: Option<String>,
    /// Upper bound on a single provider invocation.
    #[validate(range(min = 5, max = 60))]
    pub provider_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub max_requests_per_hour: usize,
    #[validate(range(min = 1, max = 2_592_000))]
    pub rate_limit_window_secs: u64,
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
    #[validate(range(min = 1, max = 86_400))]
    pub breaker_timeout_secs: u64,
    pub audit_logging_enabled: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: None,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            api_base_url: None,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            max_requests_per_hour: DEFAULT_MAX_REQUESTS_PER_HOUR,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            breaker_timeout_secs: DEFAULT_BREAKER_TIMEOUT_SECS,
            audit_logging_enabled: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

// The API key must never reach a log line.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_version", &self.model_version)
            .field("api_base_url", &self.api_base_url)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("max_requests_per_hour", &self.max_requests_per_hour)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("failure_threshold", &self.failure_threshold)
            .field("breaker_timeout_secs", &self.breaker_timeout_secs)
            .field("audit_logging_enabled", &self.audit_logging_enabled)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Non-sensitive view of the configuration, safe to log or expose on a status page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub ai_provider: ProviderKind,
    pub model_version: String,
    pub is_enabled: bool,
    pub rate_limit: usize,
    pub timeout: u64,
    pub audit_logging: bool,
}

impl GatewayConfig {
    /// Loads a `.env` file if present, then reads the process environment.
    pub fn load() -> Result<Self, AppError> {
        if dotenv::dotenv().is_err() {
            info!("No .env file found, using process environment only");
        }
        Self::from_env()
    }

    /// Builds and validates a configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let api_key = env::var("AI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let config = Self {
            provider: read_var("AI_PROVIDER")?.unwrap_or(defaults.provider),
            api_key,
            model_version: env::var("AI_MODEL_VERSION").unwrap_or(defaults.model_version),
            api_base_url: env::var("AI_API_BASE_URL").ok().filter(|u| !u.trim().is_empty()),
            provider_timeout_secs: read_var("AI_API_TIMEOUT")?
                .unwrap_or(defaults.provider_timeout_secs),
            max_requests_per_hour: read_var("MAX_REQUESTS_PER_HOUR")?
                .unwrap_or(defaults.max_requests_per_hour),
            rate_limit_window_secs: read_var("RATE_LIMIT_WINDOW_SECONDS")?
                .unwrap_or(defaults.rate_limit_window_secs),
            failure_threshold: read_var("CIRCUIT_FAILURE_THRESHOLD")?
                .unwrap_or(defaults.failure_threshold),
            breaker_timeout_secs: read_var("CIRCUIT_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.breaker_timeout_secs),
            audit_logging_enabled: env::var("AUDIT_LOGGING_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.audit_logging_enabled),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: read_var("LOG_FORMAT")?.unwrap_or(defaults.log_format),
        };

        config.validate_all()?;
        Ok(config)
    }

    /// Validates value ranges. Returns `AppError::Config` on the first violation set.
    pub fn validate_all(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.api_key.is_none() {
            warn!("AI_API_KEY not set. AI features will be disabled.");
        }
        info!(
            provider = %self.provider,
            model = %self.model_version,
            enabled = self.ai_features_enabled(),
            "AI configuration validated"
        );
        Ok(())
    }

    pub fn ai_features_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            ai_provider: self.provider,
            model_version: self.model_version.clone(),
            is_enabled: self.ai_features_enabled(),
            rate_limit: self.max_requests_per_hour,
            timeout: self.provider_timeout_secs,
            audit_logging: self.audit_logging_enabled,
        }
    }
}

fn read_var<T>(name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
