//! Predict service
//!
//! Exposes a local text-generation program as `POST /predict`
//! (`{"text"}` -> `{"answer"}`), the contract the gateway's HTTP backend
//! expects.

use chat_gateway::api::{create_predict_router, PredictState};
use chat_gateway::backend::{CommandPipeline, LocalPipelineBackend};
use chat_gateway::config::{LocalPipelineConfig, ServerConfig, DEFAULT_PREDICT_PORT};
use chat_gateway::logging;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let Some(pipeline_config) = LocalPipelineConfig::from_env() else {
        return Err("LOCAL_PIPELINE_COMMAND must be set to the generation program".into());
    };
    let server_config = ServerConfig::from_env("PREDICT_PORT", DEFAULT_PREDICT_PORT);

    tracing::info!(
        program = %pipeline_config.program,
        args = ?pipeline_config.args,
        "Using local generation program"
    );
    let pipeline = Arc::new(CommandPipeline::new(&pipeline_config));
    let backend = Arc::new(LocalPipelineBackend::new(pipeline));
    let app = create_predict_router(PredictState::new(backend));

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Predict service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
