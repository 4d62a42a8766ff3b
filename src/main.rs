//! Chat gateway server
//!
//! Serves `POST /chat`, dispatching each conversation to the configured
//! model backend.

use chat_gateway::api::{create_gateway_router, AppState};
use chat_gateway::config::{BackendConfig, ServerConfig, DEFAULT_GATEWAY_PORT};
use chat_gateway::{logging, Dispatcher, RequestHandler};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    // Configuration is read once here and never again
    let backend_config = BackendConfig::from_env();
    let server_config = ServerConfig::from_env("GATEWAY_PORT", DEFAULT_GATEWAY_PORT);

    let dispatcher = Arc::new(Dispatcher::from_config(&backend_config)?);
    match dispatcher.selected() {
        Some(kind) => tracing::info!(backend = kind.display_name(), "Dispatcher initialized"),
        None => tracing::warn!("Dispatcher has no backend; every chat request will fail"),
    }

    let state = AppState::new(RequestHandler::new(dispatcher));
    let app = create_gateway_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Chat gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
