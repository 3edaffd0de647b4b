use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable error category, stable across releases.
///
/// Callers map these to their own outcomes (HTTP status, retry policy) without
/// inspecting error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    RateLimit,
    CircuitOpen,
    Provider,
    Forbidden,
    Unavailable,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Provider => "provider",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Caller-correctable input defect (length, control bytes, unknown role).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The per-user quota for the rolling window is exhausted.
    #[error("Rate limit exceeded: max {limit} requests per window")]
    RateLimited {
        limit: usize,
        /// When the oldest request in the window expires.
        reset_at: Option<DateTime<Utc>>,
        retry_after_secs: u64,
    },

    /// The circuit breaker is open; the provider was not attempted.
    #[error("AI service unavailable: circuit breaker is open, retry in {retry_after_secs}s")]
    CircuitOpen { retry_after_secs: u64 },

    /// Upstream provider failure (transport, status, malformed envelope).
    #[error("AI provider error: {0}")]
    Provider(String),

    /// The provider did not answer within the configured timeout.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The caller's role is not allowed to use this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// AI features are disabled (no provider credentials configured).
    #[error("AI features not available: {0}")]
    Unavailable(String),

    /// Represents configuration-related errors (e.g., out-of-range environment values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::RateLimited { .. } => ErrorKind::RateLimit,
            AppError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            AppError::Provider(_) | AppError::Timeout(_) => ErrorKind::Provider,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unavailable(_) => ErrorKind::Unavailable,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Retry hint in seconds, present only for quota and breaker rejections.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AppError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            AppError::CircuitOpen { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// True for the failures the note pipeline reports as an AI service error:
    /// an open breaker, an upstream failure or a timeout.
    pub fn is_ai_service_error(&self) -> bool {
        matches!(
            self,
            AppError::CircuitOpen { .. } | AppError::Provider(_) | AppError::Timeout(_)
        )
    }
}

/// Serializable view of an error for outbound responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retry_after_secs: err.retry_after_secs(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Provider call exceeded deadline: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(format!("HTTP timeout: {}", err))
        } else {
            AppError::Provider(format!("HTTP error: {}", err))
        }
    }
}
