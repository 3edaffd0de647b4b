//! # Resilience
//!
//! Admission control and failure isolation in front of the model provider.
//!
//! - `rate_limiter`: per-key sliding-window limiter
//! - `circuit_breaker`: CLOSED / OPEN / HALF_OPEN breaker with CAS transitions
//! - `store`: storage traits and their in-process implementations

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod store;

pub use circuit_breaker::{BreakerConfig, BreakerStatus, CircuitBreaker};
pub use rate_limiter::RateLimiter;
pub use store::{
    BreakerRecord, BreakerStore, CircuitState, InMemoryBreakerStore, InMemoryRateWindowStore,
    RateDecision, RateWindowStore, Versioned,
};
