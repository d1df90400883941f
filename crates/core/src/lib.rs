//! Goal Coach Core
//!
//! Domain logic for the goal-setting assistant: the conversation stages, the
//! structured results requested from the LLM at each stage, the LLM client
//! capability, and the engine that moves a conversation from one stage to
//! the next. Nothing here knows about HTTP.

pub mod conversation;
pub mod error;
pub mod extraction;
pub mod llm_client;
pub mod prompts;
pub mod render;
pub mod schedule;
pub mod stage;

pub use conversation::{ConversationContext, ConversationEngine, TurnOutcome};
pub use error::{ConversationError, GenerationError};
pub use stage::ConversationStage;
