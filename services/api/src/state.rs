//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the long-lived
//! service handles created once at startup.

use goal_coach_core::{ConversationEngine, llm_client::LLMClient};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub llm_client: Arc<dyn LLMClient>,
}
