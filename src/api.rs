//! HTTP transport for the gateway and predict services

mod handlers;
mod types;

pub use handlers::{create_gateway_router, create_predict_router};
pub use types::*;

use crate::backend::LocalPipelineBackend;
use crate::handler::RequestHandler;
use std::sync::Arc;

/// Gateway state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: RequestHandler,
}

impl AppState {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }
}

/// Predict service state
#[derive(Clone)]
pub struct PredictState {
    pub backend: Arc<LocalPipelineBackend>,
}

impl PredictState {
    pub fn new(backend: Arc<LocalPipelineBackend>) -> Self {
        Self { backend }
    }
}
