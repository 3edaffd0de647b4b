//! Circuit breaker guarding calls to the model provider.
//!
//! ```text
//! Closed    → Open      failure_count >= failure_threshold
//! Open      → HalfOpen  first call after `timeout` since the last failure
//! HalfOpen  → Closed    `required_successes` consecutive trial successes
//! HalfOpen  → Open      any trial failure (retry clock restarts)
//! ```
//!
//! Every transition is a compare-and-swap on the versioned record in the
//! [`BreakerStore`], so concurrent callers always agree on one next state. Each record
//! carries an `epoch` that changes with the state; a success reported against an
//! older epoch is ignored while failures always count. `HalfOpen` lets a single trial
//! through at a time, so two concurrent trials can never race each other into
//! conflicting transitions.

use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::resilience::rate_limiter::ceil_secs;
use crate::resilience::store::{BreakerRecord, BreakerStore, CircuitState, InMemoryBreakerStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_REQUIRED_SUCCESSES: u32 = 2;

/// Retry hint handed to callers that arrive while a recovery trial is running.
const TRIAL_BUSY_RETRY_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub required_successes: u32,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, timeout_secs: u64) -> Self {
        Self {
            failure_threshold,
            timeout: Duration::seconds(timeout_secs as i64),
            required_successes: DEFAULT_REQUIRED_SUCCESSES,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_FAILURE_THRESHOLD,
            crate::config::DEFAULT_BREAKER_TIMEOUT_SECS,
        )
    }
}

/// Snapshot for health/status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
    pub seconds_until_retry: u64,
}

/// Admission ticket tying an outcome back to the state it was admitted under.
#[derive(Debug, Clone, Copy)]
struct Permit {
    epoch: u64,
    trial: bool,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_parts(
            name,
            config,
            Arc::new(InMemoryBreakerStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        name: impl Into<String>,
        config: BreakerConfig,
        store: Arc<dyn BreakerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            store,
            clock,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Runs `operation` through the breaker.
    ///
    /// While open, fails with `AppError::CircuitOpen` without invoking `operation`.
    /// Otherwise the operation's own error is returned unchanged after it has been
    /// counted.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let permit = self.acquire().await?;

        match operation().await {
            Ok(value) => {
                if let Err(e) = self.on_success(permit).await {
                    error!(breaker = %self.name, "failed to record success: {}", e);
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = self.on_failure(permit).await {
                    error!(breaker = %self.name, "failed to record failure: {}", e);
                }
                Err(err)
            }
        }
    }

    pub async fn state(&self) -> Result<CircuitState, AppError> {
        Ok(self.store.load().await?.value.state)
    }

    pub async fn status(&self) -> Result<BreakerStatus, AppError> {
        let record = self.store.load().await?.value;
        let seconds_until_retry = match record.state {
            CircuitState::Open => self.remaining_timeout(&record, self.clock.now()),
            _ => 0,
        };
        Ok(BreakerStatus {
            state: record.state,
            failure_count: record.failure_count,
            seconds_until_retry,
        })
    }

    fn remaining_timeout(&self, record: &BreakerRecord, now: DateTime<Utc>) -> u64 {
        match record.last_failure_at {
            Some(at) => ceil_secs(self.config.timeout - (now - at)),
            None => 0,
        }
    }

    fn trial_busy(&self, record: &BreakerRecord, now: DateTime<Utc>) -> bool {
        // An abandoned trial stops blocking once a full timeout has passed.
        record
            .trial_started_at
            .is_some_and(|started| now - started < self.config.timeout)
    }

    async fn acquire(&self) -> Result<Permit, AppError> {
        loop {
            let current = self.store.load().await?;
            let record = current.value;
            let now = self.clock.now();

            let mut next = record.clone();
            match record.state {
                CircuitState::Closed => {
                    return Ok(Permit {
                        epoch: record.epoch,
                        trial: false,
                    })
                }
                CircuitState::Open => {
                    let retry_after_secs = self.remaining_timeout(&record, now);
                    let timed_out = record
                        .last_failure_at
                        .map_or(true, |at| now - at >= self.config.timeout);
                    if !timed_out {
                        debug!(breaker = %self.name, retry_after_secs, "rejecting call while open");
                        return Err(AppError::CircuitOpen { retry_after_secs });
                    }
                    next.state = CircuitState::HalfOpen;
                    next.success_count = 0;
                    next.epoch += 1;
                }
                CircuitState::HalfOpen => {
                    if self.trial_busy(&record, now) {
                        return Err(AppError::CircuitOpen {
                            retry_after_secs: TRIAL_BUSY_RETRY_SECS,
                        });
                    }
                }
            }

            next.trial_started_at = Some(now);
            let permit = Permit {
                epoch: next.epoch,
                trial: true,
            };
            let entered_half_open = record.state == CircuitState::Open;
            if self.store.compare_and_swap(current.version, next).await? {
                if entered_half_open {
                    info!(breaker = %self.name, "circuit breaker HALF_OPEN (probing provider)");
                }
                return Ok(permit);
            }
        }
    }

    async fn on_success(&self, permit: Permit) -> Result<(), AppError> {
        loop {
            let current = self.store.load().await?;
            let record = current.value;
            if record.epoch != permit.epoch {
                debug!(breaker = %self.name, "ignoring success from a superseded state");
                return Ok(());
            }

            let mut next = record.clone();
            next.failure_count = 0;
            if permit.trial {
                next.trial_started_at = None;
            }
            let mut closed = false;
            if record.state == CircuitState::HalfOpen {
                next.success_count += 1;
                if next.success_count >= self.config.required_successes {
                    next.state = CircuitState::Closed;
                    next.success_count = 0;
                    next.epoch += 1;
                    closed = true;
                }
            }

            if next == record {
                return Ok(());
            }
            if self.store.compare_and_swap(current.version, next).await? {
                if closed {
                    info!(breaker = %self.name, "circuit breaker CLOSED (service recovered)");
                }
                return Ok(());
            }
        }
    }

    async fn on_failure(&self, permit: Permit) -> Result<(), AppError> {
        loop {
            let current = self.store.load().await?;
            let record = current.value;
            let now = self.clock.now();

            let mut next = record.clone();
            next.failure_count = next.failure_count.saturating_add(1);
            next.last_failure_at = Some(now);
            if permit.trial && permit.epoch == record.epoch {
                next.trial_started_at = None;
            }

            let mut opened = false;
            match record.state {
                CircuitState::HalfOpen => {
                    next.state = CircuitState::Open;
                    next.success_count = 0;
                    next.trial_started_at = None;
                    next.epoch += 1;
                    opened = true;
                }
                CircuitState::Closed if next.failure_count >= self.config.failure_threshold => {
                    next.state = CircuitState::Open;
                    next.trial_started_at = None;
                    next.epoch += 1;
                    opened = true;
                }
                _ => {}
            }

            let was_half_open = record.state == CircuitState::HalfOpen;
            let failures = next.failure_count;
            if self.store.compare_and_swap(current.version, next).await? {
                if opened && was_half_open {
                    warn!(breaker = %self.name, "circuit breaker OPEN (recovery failed)");
                } else if opened {
                    warn!(
                        breaker = %self.name,
                        failures,
                        timeout_secs = self.config.timeout.num_seconds(),
                        "circuit breaker OPEN, provider calls will fail fast"
                    );
                }
                return Ok(());
            }
        }
    }
}
