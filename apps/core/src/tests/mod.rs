//! Test Module
//!
//! Scenario suites for the gateway. Unit tests live next to the code they cover.
//!
//! ## Test Categories
//! - `pipeline_tests`: note interpretation end to end through mocked providers
//! - `assistant_tests`: guided assistant turns through the gateway
//! - `chaos_test`: concurrent admission and breaker behaviour under load

pub mod chaos_test;

use crate::audit::MemoryAuditSink;
use crate::clock::ManualClock;
use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::gateway::Gateway;
use crate::interpretation::NoteRequest;
use crate::provider::{CompletionProvider, CompletionRequest};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

// --- Mock Components ---

pub enum MockBehavior {
    Reply(String),
    Fail,
    Hang(Duration),
    Panic,
}

pub struct MockProvider {
    behavior: MockBehavior,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(MockBehavior::Reply(text.to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.user_prompt);
        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail => Err(AppError::Provider("Simulated upstream failure".to_string())),
            MockBehavior::Hang(duration) => {
                sleep(*duration).await;
                Ok("too late".to_string())
            }
            MockBehavior::Panic => panic!("simulated provider bug"),
        }
    }
}

pub const STRUCTURED_REPLY: &str = r#"{
    "formatted": "**Chief Complaint:** Persistent cough\n**Vitals:** SpO2 98% on room air",
    "clinical": "3-week dry cough without fever. Possible viral bronchitis.",
    "patientFriendly": "You have had a dry cough for 3 weeks. Your oxygen level is normal."
}"#;

pub fn enabled_config() -> GatewayConfig {
    GatewayConfig {
        api_key: Some("test-key".to_string()),
        ..GatewayConfig::default()
    }
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 2, 26, 9, 0, 0).unwrap(),
    ))
}

pub struct Harness {
    pub gateway: Gateway,
    pub provider: Arc<MockProvider>,
    pub audit: Arc<MemoryAuditSink>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(config: GatewayConfig, provider: Arc<MockProvider>) -> Harness {
    let audit = Arc::new(MemoryAuditSink::new());
    let clock = test_clock();
    let gateway = Gateway::builder(config)
        .provider(provider.clone())
        .audit_sink(audit.clone())
        .clock(clock.clone())
        .build()
        .expect("gateway should build");
    Harness {
        gateway,
        provider,
        audit,
        clock,
    }
}

pub fn note(text: &str) -> NoteRequest {
    NoteRequest {
        note_id: "note-001".to_string(),
        raw_note_text: text.to_string(),
        patient_id: "patient-314".to_string(),
        doctor_id: "doctor-7".to_string(),
    }
}
