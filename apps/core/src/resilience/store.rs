//! Storage seams for the rate limiter and circuit breaker.
//!
//! Both components keep their shared state behind these traits so a distributed
//! backing store can replace the in-process one without touching call sites. Only
//! the in-process implementations ship here; state is per-process.

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Outcome of one admission attempt against a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: usize,
}

impl RateDecision {
    pub fn denied() -> Self {
        Self {
            allowed: false,
            remaining: 0,
        }
    }
}

#[async_trait]
pub trait RateWindowStore: Send + Sync + 'static {
    /// Evicts timestamps at or before `now - window`, then records `now` if fewer than
    /// `limit` remain. The whole sequence must be atomic per key.
    async fn admit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        limit: usize,
    ) -> Result<RateDecision, AppError>;

    /// Earliest timestamp still inside the window for `key`, if any.
    async fn oldest(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<DateTime<Utc>>, AppError>;
}

type Windows = HashMap<String, VecDeque<DateTime<Utc>>>;

/// Admissions between sweeps that drop keys whose windows have emptied.
pub const SWEEP_INTERVAL: usize = 64;

/// Process-local sliding windows: one ordered deque of timestamps per key.
#[derive(Debug, Default)]
pub struct InMemoryRateWindowStore {
    windows: Mutex<Windows>,
    admissions: AtomicUsize,
}

impl InMemoryRateWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently holding at least one timestamp (or not yet swept).
    pub fn tracked_keys(&self) -> usize {
        self.lock().map(|windows| windows.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Windows>, AppError> {
        self.windows
            .lock()
            .map_err(|_| AppError::Internal("rate window store lock poisoned".to_string()))
    }
}

fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn evict(entries: &mut VecDeque<DateTime<Utc>>, window_start: DateTime<Utc>) {
    // Timestamps are pushed in order, so expired ones sit at the front.
    while entries.front().is_some_and(|ts| *ts <= window_start) {
        entries.pop_front();
    }
}

#[async_trait]
impl RateWindowStore for InMemoryRateWindowStore {
    async fn admit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        limit: usize,
    ) -> Result<RateDecision, AppError> {
        let start = window_start(now, window);
        let mut windows = self.lock()?;

        if self.admissions.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            windows.retain(|_, entries| {
                evict(entries, start);
                !entries.is_empty()
            });
        }

        let entries = windows.entry(key.to_string()).or_default();
        evict(entries, start);

        if entries.len() < limit {
            entries.push_back(now);
            Ok(RateDecision {
                allowed: true,
                remaining: limit - entries.len(),
            })
        } else {
            if entries.is_empty() {
                windows.remove(key);
            }
            Ok(RateDecision::denied())
        }
    }

    async fn oldest(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let mut windows = self.lock()?;
        let Some(entries) = windows.get_mut(key) else {
            return Ok(None);
        };
        evict(entries, window_start(now, window));
        let oldest = entries.front().copied();
        if entries.is_empty() {
            windows.remove(key);
        }
        Ok(oldest)
    }
}

/// Circuit breaker state names as exposed on status surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Persisted breaker state. `epoch` increases on every state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerRecord {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Successful trials since entering `HalfOpen`.
    pub success_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// Set while a recovery trial is in flight.
    pub trial_started_at: Option<DateTime<Utc>>,
    pub epoch: u64,
}

impl Default for BreakerRecord {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            trial_started_at: None,
            epoch: 0,
        }
    }
}

/// A record together with the store version it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[async_trait]
pub trait BreakerStore: Send + Sync + 'static {
    async fn load(&self) -> Result<Versioned<BreakerRecord>, AppError>;

    /// Writes `record` only if the stored version is still `expected_version`.
    /// Returns `false` when another writer got there first.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        record: BreakerRecord,
    ) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryBreakerStore {
    slot: Mutex<Versioned<BreakerRecord>>,
}

impl InMemoryBreakerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BreakerStore for InMemoryBreakerStore {
    async fn load(&self) -> Result<Versioned<BreakerRecord>, AppError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| AppError::Internal("breaker store lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        record: BreakerRecord,
    ) -> Result<bool, AppError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AppError::Internal("breaker store lock poisoned".to_string()))?;
        if slot.version != expected_version {
            return Ok(false);
        }
        slot.version += 1;
        slot.value = record;
        Ok(true)
    }
}
