//! Main Entrypoint for the Goal Coach API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Initializing shared services (the LLM client, prompts and conversation engine).
//! 4. Constructing the Axum router.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use goal_coach_api::{config::Config, router::create_router, state::AppState};
use goal_coach_core::{
    ConversationEngine,
    llm_client::{LLMClient, OpenAICompatibleClient},
    prompts::PromptLibrary,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");
    if config.api_key_is_placeholder {
        warn!(
            provider = ?config.provider,
            "No API key configured; using a placeholder. LLM calls will fail until one is set."
        );
    }

    // --- 3. Initialize Shared Services ---
    let prompts = match &config.prompts_path {
        Some(path) => {
            info!(path = %path.display(), "Loading prompt overrides");
            PromptLibrary::from_dir(path)?
        }
        None => PromptLibrary::builtin(),
    };

    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.api_key)
        .with_api_base(config.provider.api_base());
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
        config.llm_timeout,
    ));

    let engine = ConversationEngine::new(llm_client.clone(), Arc::new(prompts))
        .with_transition_validation(config.stage_validation);

    let app_state = Arc::new(AppState {
        engine: Arc::new(engine),
        llm_client,
    });

    // --- 4. Create Router ---
    let app = create_router(app_state);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        stage_validation = config.stage_validation,
        production = config.production,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
