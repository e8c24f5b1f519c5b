//! Conversation engine for Cora.
//!
//! Turns one user question into a sequence of backend calls, classifies the
//! outcome, and records both sides of the exchange in the session transcript.

pub mod classifier;
pub mod cycle;
pub mod error;
pub mod orchestrator;
pub mod transcript;
pub mod types;

pub use classifier::classify;
pub use cycle::{validate_transition, CycleState, RequestCycle};
pub use error::ChatError;
pub use orchestrator::{ChatOrchestrator, MAX_MESSAGE_LENGTH, VIZ_ROW_LIMIT};
pub use transcript::Transcript;
pub use types::{OutcomeKind, Role, Turn, TurnPayload};
