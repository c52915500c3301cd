#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Conversational agents: the structured intent vocabulary robots answer in,
//! the chat-completion client they answer through, the pluggable decision
//! strategies, and the simulated user that issues and grades commands.

/// Structured robot intents and their JSON wire form.
#[path = "../intent.rs"]
pub mod intent;

/// Chat-completion client abstraction and the OpenAI-compatible HTTP client.
#[path = "../llm.rs"]
pub mod llm;

/// Robot decision strategies behind a single trait.
#[path = "../decision.rs"]
pub mod decision;

/// Simulated user: command generation, responses, and goal-progress checks.
#[path = "../user.rs"]
pub mod user;

pub use decision::{
    DecisionAgent, DecisionContext, LlmDecisionAgent, ModelVariant, ScriptedDecisionAgent,
};
pub use intent::{ActionIntent, ActionKind, FrictionType, Intent, IntentError};
pub use llm::{ChatClient, ChatMessage, LlmError, OpenAiChat, ScriptedChat};
pub use user::SimulatedUser;
