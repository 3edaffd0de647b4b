//! # Gateway
//!
//! The request orchestrator. Every call from the record-keeping application into
//! the model provider goes through here:
//!
//! ```text
//! note: guards → validate → rate limit → redact → breaker(timeout(provider)) → parse → extract
//! chat: guards → validate → classify → reply + actions + disclaimer
//! ```
//!
//! Each stage short-circuits with a typed [`AppError`]. Panics inside a pipeline are
//! caught at this boundary and reported as a generic internal error.

pub mod guards;

use crate::assistant::{ChatAssistant, ChatReply, ChatRequest, Role};
use crate::audit::{
    hash_id, AuditEvent, AuditResult, AuditSink, TracingAuditSink, CHAT_SERVICE, NOTE_SERVICE,
};
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::interpretation::prompt::interpretation_request;
use crate::interpretation::{
    EntityExtractor, EntityVocabulary, InterpretationMetadata, InterpretationResult, NoteRequest,
    ResponseParser,
};
use crate::phi::PhiRedactor;
use crate::provider::{CompletionProvider, HttpCompletionProvider};
use crate::resilience::{
    BreakerConfig, BreakerStatus, BreakerStore, CircuitBreaker, InMemoryBreakerStore,
    InMemoryRateWindowStore, RateLimiter, RateWindowStore,
};
use futures::FutureExt;
use guards::{check_all, GuardContext, CHAT_GUARDS, NOTE_GUARDS};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Health view: configuration summary plus live breaker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub ai_enabled: bool,
    pub provider: String,
    pub model: String,
    pub circuit_breaker: BreakerStatus,
}

/// Assembles a [`Gateway`]. Anything not supplied gets the in-process default.
pub struct GatewayBuilder {
    config: GatewayConfig,
    provider: Option<Arc<dyn CompletionProvider>>,
    audit: Option<Arc<dyn AuditSink>>,
    clock: Option<Arc<dyn Clock>>,
    rate_store: Option<Arc<dyn RateWindowStore>>,
    breaker_store: Option<Arc<dyn BreakerStore>>,
    vocabulary: EntityVocabulary,
}

impl GatewayBuilder {
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn rate_store(mut self, store: Arc<dyn RateWindowStore>) -> Self {
        self.rate_store = Some(store);
        self
    }

    pub fn breaker_store(mut self, store: Arc<dyn BreakerStore>) -> Self {
        self.breaker_store = Some(store);
        self
    }

    pub fn vocabulary(mut self, vocabulary: EntityVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Validates the configuration. When AI is enabled and no provider was supplied,
    /// the HTTP adapter for the configured provider is used.
    pub fn build(self) -> Result<Gateway, AppError> {
        let config = self.config;
        config.validate_all()?;

        let provider = match self.provider {
            Some(provider) => Some(provider),
            None if config.ai_features_enabled() => {
                Some(Arc::new(HttpCompletionProvider::from_config(&config)?) as Arc<dyn CompletionProvider>)
            }
            None => None,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let rate_store = self
            .rate_store
            .unwrap_or_else(|| Arc::new(InMemoryRateWindowStore::new()));
        let breaker_store = self
            .breaker_store
            .unwrap_or_else(|| Arc::new(InMemoryBreakerStore::new()));

        let limiter = RateLimiter::with_parts(
            config.max_requests_per_hour,
            config.rate_limit_window_secs,
            rate_store,
            clock.clone(),
        );
        let breaker = CircuitBreaker::with_parts(
            "ai_provider",
            BreakerConfig::new(config.failure_threshold, config.breaker_timeout_secs),
            breaker_store,
            clock.clone(),
        );

        Ok(Gateway {
            inner: Arc::new(GatewayInner {
                limiter,
                breaker,
                provider,
                audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
                clock,
                redactor: PhiRedactor::new(),
                parser: ResponseParser::new(),
                extractor: EntityExtractor::with_vocabulary(self.vocabulary),
                assistant: ChatAssistant::new(),
                config,
            }),
        })
    }
}

struct GatewayInner {
    config: GatewayConfig,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    provider: Option<Arc<dyn CompletionProvider>>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    redactor: PhiRedactor,
    parser: ResponseParser,
    extractor: EntityExtractor,
    assistant: ChatAssistant,
}

/// Cloneable handle to the shared pipeline state.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder {
            config,
            provider: None,
            audit: None,
            clock: None,
            rate_store: None,
            breaker_store: None,
            vocabulary: EntityVocabulary::default(),
        }
    }

    /// Production wiring: HTTP provider (when a key is set), tracing audit sink.
    pub fn from_config(config: GatewayConfig) -> Result<Self, AppError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Interprets a clinical note on behalf of `role`.
    ///
    /// The rate limit is keyed on `request.doctor_id`. Only the redacted note is
    /// sent to the provider.
    #[instrument(skip(self, request))]
    pub async fn interpret_note(
        &self,
        role: Role,
        request: NoteRequest,
    ) -> Result<InterpretationResult, AppError> {
        let outcome = AssertUnwindSafe(self.run_note_pipeline(role, &request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Note pipeline panicked");
                Err(AppError::Internal("note pipeline panicked".to_string()))
            });

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => {
                self.audit(
                    AuditEvent::new(
                        &request.doctor_id,
                        "note_interpretation_failed",
                        NOTE_SERVICE,
                        AuditResult::Failure,
                    )
                    .with("patient_hash", hash_id(&request.patient_id))
                    .with("error_kind", err.kind().as_str()),
                );
                Err(normalize(err))
            }
        }
    }

    async fn run_note_pipeline(
        &self,
        role: Role,
        request: &NoteRequest,
    ) -> Result<InterpretationResult, AppError> {
        let inner = &self.inner;
        check_all(
            NOTE_GUARDS,
            &GuardContext {
                role: Some(role),
                ai_enabled: self.ai_enabled(),
            },
        )?;

        request.validate()?;
        let remaining = inner.limiter.check(&request.doctor_id).await?;

        let note_length = request.raw_note_text.chars().count();
        self.audit(
            AuditEvent::new(
                &request.doctor_id,
                "note_interpretation_requested",
                NOTE_SERVICE,
                AuditResult::Requested,
            )
            .with("patient_hash", hash_id(&request.patient_id))
            .with("note_hash", hash_id(&request.note_id))
            .with("note_length", note_length),
        );

        let (redacted, report) = inner.redactor.redact_with_report(&request.raw_note_text);
        debug!(redactions = report.total(), "Note de-identified");

        let provider = inner
            .provider
            .clone()
            .ok_or_else(|| AppError::Unavailable("no completion provider configured".to_string()))?;
        let provider_name = provider.name().to_string();
        let completion = interpretation_request(&redacted, &inner.config.model_version);
        let deadline = inner.config.provider_timeout();

        let started = Instant::now();
        let raw = inner
            .breaker
            .call(|| async move {
                timeout(deadline, provider.complete(completion))
                    .await
                    .unwrap_or_else(|elapsed| Err(elapsed.into()))
            })
            .await
            .map_err(|err| {
                warn!(error_kind = %err.kind(), "AI provider call failed: {}", err);
                err
            })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = inner.parser.parse(&raw);
        let entities = inner.extractor.extract(&outcome.interpretation);

        self.audit(
            AuditEvent::new(
                &request.doctor_id,
                "note_interpretation_completed",
                NOTE_SERVICE,
                AuditResult::Success,
            )
            .with("patient_hash", hash_id(&request.patient_id))
            .with("model", inner.config.model_version.clone())
            .with("response_length", raw.chars().count())
            .with("symptoms_found", entities.symptoms.len())
            .with("parse_degraded", outcome.degradation.is_some())
            .with("latency_ms", latency_ms),
        );
        info!(latency_ms, degraded = outcome.degradation.is_some(), "Note interpreted");

        let metadata = InterpretationMetadata {
            model_version: inner.config.model_version.clone(),
            provider: provider_name,
            timestamp_utc: inner.clock.now(),
            latency_ms,
        };
        Ok(InterpretationResult::assemble(
            request.note_id.clone(),
            outcome,
            entities,
            metadata,
            remaining,
        ))
    }

    /// Answers one assistant turn.
    #[instrument(skip(self, request), fields(role = %request.role))]
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, AppError> {
        let outcome = AssertUnwindSafe(async { self.run_chat(&request) })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Chat pipeline panicked");
                Err(AppError::Internal("chat pipeline panicked".to_string()))
            });
        outcome.map_err(normalize)
    }

    fn run_chat(&self, request: &ChatRequest) -> Result<ChatReply, AppError> {
        check_all(
            CHAT_GUARDS,
            &GuardContext {
                role: None,
                ai_enabled: self.ai_enabled(),
            },
        )?;

        let (role, reply) = self.inner.assistant.respond(request)?;

        self.audit(
            AuditEvent::new(&request.user_id, "chatbot_response", CHAT_SERVICE, AuditResult::Success)
                .with("conversation_hash", hash_id(&request.conversation_id))
                .with("role", role.as_str())
                .with("intent", reply.intent.label())
                .with("message_length", request.message.chars().count())
                .with("actions", reply.suggested_actions.len()),
        );
        Ok(reply)
    }

    pub async fn status(&self) -> Result<GatewayStatus, AppError> {
        let inner = &self.inner;
        Ok(GatewayStatus {
            ai_enabled: self.ai_enabled(),
            provider: inner.config.provider.as_str().to_string(),
            model: inner.config.model_version.clone(),
            circuit_breaker: inner.breaker.status().await?,
        })
    }

    fn ai_enabled(&self) -> bool {
        self.inner.config.ai_features_enabled() && self.inner.provider.is_some()
    }

    fn audit(&self, event: AuditEvent) {
        if self.inner.config.audit_logging_enabled {
            self.inner.audit.record(event.at(self.inner.clock.now()));
        }
    }
}

/// Internal details are logged, never returned.
fn normalize(err: AppError) -> AppError {
    match err {
        AppError::Internal(detail) => {
            error!(detail = %detail, "Internal failure at gateway boundary");
            AppError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
        }
        other => other,
    }
}
