// Afyaclick AI gateway core
// Resilience and safety pipeline between the clinical record system and the model provider

pub mod assistant;
pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod interpretation;
pub mod phi;
pub mod provider;
pub mod resilience;
pub mod telemetry;
pub mod validation;

pub use assistant::{ChatReply, ChatRequest, Role};
pub use config::GatewayConfig;
pub use error::{AppError, ErrorKind};
pub use gateway::{Gateway, GatewayBuilder, GatewayStatus};
pub use interpretation::{InterpretationResult, NoteRequest};

#[cfg(test)]
mod tests;
