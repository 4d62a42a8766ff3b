//! External HTTP model backend
//!
//! Posts `{"text": <prompt>}` to a configured endpoint and reads the reply
//! from the `answer` field of the JSON response.

use super::{BackendKind, ChatBackend, NormalizedReply};
use crate::config::{HttpBackendConfig, PromptFormat};
use crate::conversation::{Conversation, Turn};
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Backend calling a single JSON endpoint
pub struct HttpModelBackend {
    client: Client,
    url: String,
    prompt_format: PromptFormat,
}

impl HttpModelBackend {
    pub fn new(config: &HttpBackendConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            prompt_format: config.prompt_format,
        })
    }

    fn translate_request<'a>(&self, conversation: &'a Conversation) -> PredictRequest<'a> {
        PredictRequest {
            text: conversation.to_transcript(),
            messages: match self.prompt_format {
                PromptFormat::Transcript => None,
                PromptFormat::Structured => Some(conversation.turns()),
            },
        }
    }

    fn classify_transport_error(e: &reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::timeout(format!("External API timed out: {e}"))
        } else {
            ChatError::unavailable(format!("External API URL Error: {e}"))
        }
    }

    fn normalize_response(body: &str) -> Result<NormalizedReply, ChatError> {
        let parsed: PredictResponse = serde_json::from_str(body).map_err(|e| {
            ChatError::protocol(format!("External API returned invalid JSON: {e}"))
        })?;

        match parsed.answer {
            Some(serde_json::Value::String(answer)) if !answer.is_empty() => {
                Ok(NormalizedReply::new(answer))
            }
            Some(serde_json::Value::String(_)) => {
                Err(ChatError::protocol("External API returned an empty answer"))
            }
            Some(other) => Err(ChatError::protocol(format!(
                "External API answer is not a string: {other}"
            ))),
            None => Err(ChatError::protocol(
                "External API response is missing the answer field",
            )),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpModelBackend {
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        let request = self.translate_request(conversation);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::classify_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify_transport_error(&e))?;

        if !status.is_success() {
            return Err(
                ChatError::unavailable(format!("External API HTTP {}: {body}", status.as_u16()))
                    .with_upstream_status(status.as_u16()),
            );
        }

        Self::normalize_response(&body)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<&'a [Turn]>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    answer: Option<serde_json::Value>,
}
