//! Fable API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use fable_content::YamlDeck;
use fable_core::clock::SystemClock;
use fable_core::moral::MoralGenerator;
use fable_core::rng::SystemRng;
use fable_game::application::registry::SessionRegistry;
use fable_textgen::{DisabledMoralGenerator, HttpMoralGenerator};

use fable_api::config::ServerConfig;
use fable_api::error::AppError;
use fable_api::hub::ConnectionHub;
use fable_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration from environment.
    let config = ServerConfig::from_env()?;

    // Initialize tracing subscriber.
    let tracer_provider = fable_api::telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Fable party game server");

    // Load the deck once; it is read-only afterwards.
    let deck = match &config.deck_path {
        Some(path) => YamlDeck::from_path(path)?,
        None => YamlDeck::builtin()?,
    };

    let moral_generator: Arc<dyn MoralGenerator> = match config.moral_service.clone() {
        Some(service) => {
            tracing::info!(url = %service.api_url, model = %service.model, "moral service enabled");
            Arc::new(HttpMoralGenerator::new(service, config.game.moral_timeout).map_err(AppError::from)?)
        }
        None => {
            tracing::info!("no moral service configured, using fallback morals");
            Arc::new(DisabledMoralGenerator)
        }
    };

    // Build application state.
    let hub = Arc::new(ConnectionHub::new());
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(deck),
        moral_generator,
        hub.clone(),
        Arc::new(SystemClock),
        Box::new(SystemRng::from_entropy()),
        config.game,
    ));
    let app = fable_api::app(AppState::new(registry, hub));

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }

    Ok(())
}
