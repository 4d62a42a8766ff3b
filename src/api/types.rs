//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to the predict endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub text: Option<String>,
}

/// Response from the predict endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub answer: String,
}

/// Response for health checks
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
