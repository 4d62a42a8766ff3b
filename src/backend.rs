//! Backend adapters
//!
//! Each backend turns a [`Conversation`] into its own wire request and its
//! response back into a [`NormalizedReply`].

mod http;
mod local;
mod managed;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpModelBackend;
pub use local::{
    CommandPipeline, GeneratedSequence, GenerationParams, LocalPipelineBackend,
    TextGenerationPipeline, FALLBACK_REPLY,
};
pub use managed::{
    extract_region, ConverseClient, ConverseMessage, ConverseText, InferenceConfig,
    ManagedInference, ManagedModelBackend, ManagedRequest, DEFAULT_REGION,
};

use crate::conversation::Conversation;
use crate::error::ChatError;
use async_trait::async_trait;
use std::sync::Arc;

/// Backend-agnostic result of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReply {
    pub text: String,
}

impl NormalizedReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Http,
    Managed,
    LocalPipeline,
}

impl BackendKind {
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Http => "http",
            BackendKind::Managed => "managed",
            BackendKind::LocalPipeline => "local-pipeline",
        }
    }
}

/// Common interface for text-generation backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the assistant reply for the conversation so far
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError>;

    fn kind(&self) -> BackendKind;
}

/// Logging wrapper for backends
pub struct LoggingBackend {
    inner: Arc<dyn ChatBackend>,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn ChatBackend>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ChatBackend for LoggingBackend {
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(conversation).await;
        let duration = start.elapsed();
        let backend = self.inner.kind().display_name();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    backend,
                    duration_ms = %duration.as_millis(),
                    turns = conversation.len(),
                    reply_chars = reply.text.chars().count(),
                    "Backend request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend,
                    duration_ms = %duration.as_millis(),
                    error_kind = %e.kind,
                    backend_side = e.kind.is_backend_side(),
                    upstream_status = ?e.upstream_status,
                    error = %e.message,
                    "Backend request failed"
                );
            }
        }

        result
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }
}
