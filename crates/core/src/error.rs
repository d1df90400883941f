//! Error types shared by the LLM client and the conversation engine.

use crate::stage::ConversationStage;
use async_openai::error::OpenAIError;
use std::time::Duration;

/// Failures of a single upstream generation call.
///
/// Every variant means the request could not produce a trustworthy result;
/// none of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] OpenAIError),
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM response had no content")]
    EmptyResponse,
    #[error("LLM output for '{schema}' could not be parsed: {source}")]
    Malformed {
        schema: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("LLM output for '{schema}' violated its contract: {reason}")]
    ContractViolation { schema: String, reason: String },
}

/// Failures of a single conversation turn.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Stage {stage} requires an extracted goal, but none was provided")]
    MissingGoal { stage: ConversationStage },
}
