use crate::error::GenerationError;
use crate::extraction::{OutputSchema, StructuredOutput};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A single prompt sent to the LLM, optionally bound to an output shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub schema: Option<OutputSchema>,
}

impl GenerationRequest {
    /// A free-text request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            schema: None,
        }
    }

    /// A request whose output must conform to `T`'s schema.
    pub fn structured<T: StructuredOutput>(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            schema: Some(OutputSchema::of::<T>()),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Name of the requested schema, if any.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_ref().map(|s| s.name.as_str())
    }
}

/// A generic client for interacting with an LLM.
///
/// Implementations must honor `request.schema` as a strict structured-output
/// contract: either return text that parses into that shape, or fail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming call and returns the raw response text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Lightweight round trip used to confirm upstream connectivity.
    async fn ping(&self) -> Result<(), GenerationError> {
        self.generate(GenerationRequest::text("Reply with the single word OK."))
            .await
            .map(|_| ())
    }
}

/// Sends `request` for `T`, then parses and validates the result.
pub async fn generate_structured<T: StructuredOutput>(
    client: &dyn LLMClient,
    request: GenerationRequest,
) -> Result<T, GenerationError> {
    let raw = client.generate(request).await?;
    parse_structured(&raw)
}

/// Parses a raw structured response into `T`, then checks its contract.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, GenerationError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    let value: T = serde_json::from_str(body).map_err(|source| GenerationError::Malformed {
        schema: T::SCHEMA_NAME.to_string(),
        source,
    })?;
    value
        .validate()
        .map_err(|reason| GenerationError::ContractViolation {
            schema: T::SCHEMA_NAME.to_string(),
            reason,
        })?;
    Ok(value)
}

/// Removes a surrounding Markdown code fence (```json ... ```), if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
///
/// Gemini is reached through its OpenAI-compatible endpoint, so the same
/// client serves both providers.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gemini-2.0-flash").
    /// * `timeout` - Upper bound on a single call; exceeding it fails the call.
    pub fn new(config: OpenAIConfig, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt)
                .build()?
                .into(),
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(schema) = request.schema {
            debug!(schema = %schema.name, "Requesting structured output");
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: schema.name,
                    description: Some(schema.description),
                    schema: Some(schema.schema),
                    strict: Some(true),
                },
            });
        }
        let chat_request = args.build()?;

        let response = bounded(self.timeout, self.client.chat().create(chat_request)).await?;
        first_content(response)
    }
}

/// Awaits an upstream call, failing with `Timeout` once `limit` has elapsed.
async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, OpenAIError>>,
) -> Result<T, GenerationError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(GenerationError::Timeout(limit)),
    }
}

/// The text of the first choice; missing or blank content is an error.
fn first_content(response: CreateChatCompletionResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}
