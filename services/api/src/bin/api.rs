//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileExtractor, JsonFileStore, OpenAiFlashcardAdapter},
    config::{Config, ConfigError},
    error::ApiError,
    web::{build_router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use flashcard_core::FlashcardApp;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Restore the Stored Session ---
    let store = Arc::new(JsonFileStore::new(config.store_path.clone()));
    info!("Loading session from {}", store.path().display());
    let mut app = FlashcardApp::load(store);
    if let Err(e) = app.check_store() {
        warn!("Session store is not writable ({}); changes will be kept in memory only.", e);
    }

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let generator = Arc::new(OpenAiFlashcardAdapter::new(
        openai_client,
        config.generation_model.clone(),
    ));
    let extractor = Arc::new(FileExtractor::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        app: Arc::new(Mutex::new(app)),
        config: config.clone(),
        extractor,
        generator,
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
