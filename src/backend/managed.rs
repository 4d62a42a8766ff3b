//! Managed model service backend (Bedrock Converse)
//!
//! Turns are sent as structured messages with a fixed inference
//! configuration. The service client is created lazily, once per process,
//! for the region derived from the runtime identifier.

use super::{BackendKind, ChatBackend, NormalizedReply};
use crate::config::ManagedBackendConfig;
use crate::conversation::Conversation;
use crate::error::ChatError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Region used when the runtime identifier carries none
pub const DEFAULT_REGION: &str = "us-east-1";

const CONVERSE_TIMEOUT: Duration = Duration::from_secs(60);

static RE_LAMBDA_ARN_REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"arn:aws:lambda:([^:]+):").expect("invalid regex"));

/// Region component of a function ARN, or [`DEFAULT_REGION`]
pub fn extract_region(identifier: &str) -> String {
    RE_LAMBDA_ARN_REGION
        .captures(identifier)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| DEFAULT_REGION.to_string(), |m| m.as_str().to_string())
}

/// Fixed sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub stop_sequences: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            stop_sequences: Vec::new(),
        }
    }
}

/// One managed-service message: role plus a list of text blocks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ConverseText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverseText {
    pub text: String,
}

/// Everything one inference call needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedRequest {
    #[serde(skip)]
    pub model_id: String,
    pub messages: Vec<ConverseMessage>,
    pub inference_config: InferenceConfig,
}

/// The managed inference call; returns the raw response document
#[async_trait]
pub trait ManagedInference: Send + Sync {
    async fn converse(&self, request: &ManagedRequest) -> Result<Value, ChatError>;
}

type ClientFactory = dyn Fn(&str) -> Result<Arc<dyn ManagedInference>, ChatError> + Send + Sync;

/// Backend backed by the managed model service
pub struct ManagedModelBackend {
    model_id: String,
    region: String,
    client: OnceCell<Arc<dyn ManagedInference>>,
    factory: Box<ClientFactory>,
}

impl ManagedModelBackend {
    pub fn new(config: &ManagedBackendConfig) -> Self {
        let api_key = config.api_key.clone();
        let endpoint = config.endpoint.clone();
        Self::with_client_factory(config, move |region| {
            let client = ConverseClient::new(region, &api_key, endpoint.as_deref())?;
            Ok(Arc::new(client) as Arc<dyn ManagedInference>)
        })
    }

    /// Use a custom constructor for the service client
    pub fn with_client_factory(
        config: &ManagedBackendConfig,
        factory: impl Fn(&str) -> Result<Arc<dyn ManagedInference>, ChatError> + Send + Sync + 'static,
    ) -> Self {
        let region = config
            .runtime_identifier
            .as_deref()
            .map_or_else(|| DEFAULT_REGION.to_string(), extract_region);

        Self {
            model_id: config.model_id.clone(),
            region,
            client: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Shared client, created on first use. Concurrent first callers wait on
    /// the same initialization.
    async fn client(&self) -> Result<&Arc<dyn ManagedInference>, ChatError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(region = %self.region, model = %self.model_id, "Creating managed inference client");
                (self.factory)(&self.region)
            })
            .await
    }

    fn translate_request(&self, conversation: &Conversation) -> ManagedRequest {
        let messages = conversation
            .turns()
            .iter()
            .map(|turn| ConverseMessage {
                role: turn.role().as_str().to_string(),
                content: vec![ConverseText {
                    text: turn.content().to_string(),
                }],
            })
            .collect();

        ManagedRequest {
            model_id: self.model_id.clone(),
            messages,
            inference_config: InferenceConfig::default(),
        }
    }

    fn normalize_response(response: &Value) -> Result<NormalizedReply, ChatError> {
        let text = response
            .pointer("/output/message/content/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ChatError::protocol("Managed model response has no output.message.content[0].text")
            })?;

        if text.is_empty() {
            return Err(ChatError::protocol("Managed model returned an empty reply"));
        }
        Ok(NormalizedReply::new(text))
    }
}

#[async_trait]
impl ChatBackend for ManagedModelBackend {
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        let request = self.translate_request(conversation);
        let client = self.client().await?;
        let response = client.converse(&request).await?;
        Self::normalize_response(&response)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Managed
    }
}

/// HTTP client for the Converse API, authenticated with a bearer credential
pub struct ConverseClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl ConverseClient {
    pub fn new(region: &str, api_key: &str, endpoint: Option<&str>) -> Result<Self, ChatError> {
        let base_url = match endpoint {
            Some(url) => url.to_string(),
            None => format!("https://bedrock-runtime.{region}.amazonaws.com"),
        };
        let base_url = Url::parse(&base_url).map_err(|e| {
            ChatError::internal(format!("Invalid managed endpoint {base_url}: {e}"))
        })?;

        let client = Client::builder()
            .timeout(CONVERSE_TIMEOUT)
            .build()
            .map_err(|e| ChatError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url,
        })
    }

    /// `{base}/model/{model_id}/converse`, with the model id as one encoded
    /// segment (inference-profile ARNs contain `/`)
    fn converse_url(&self, model_id: &str) -> Result<Url, ChatError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ChatError::internal(format!("Managed endpoint cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["model", model_id, "converse"]);
        Ok(url)
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> ChatError {
        ChatError::unavailable(format!("Managed model HTTP {}: {body}", status.as_u16()))
            .with_upstream_status(status.as_u16())
    }
}

#[async_trait]
impl ManagedInference for ConverseClient {
    async fn converse(&self, request: &ManagedRequest) -> Result<Value, ChatError> {
        let url = self.converse_url(&request.model_id)?;

        let transport_error = |e: reqwest::Error| {
            if e.is_timeout() {
                ChatError::timeout(format!("Managed model timed out: {e}"))
            } else {
                ChatError::unavailable(format!("Managed model request failed: {e}"))
            }
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ChatError::protocol(format!("Managed model returned invalid JSON: {e}"))
        })
    }
}
