//! Backend selection
//!
//! Exactly one backend serves every request, chosen by static precedence:
//! a configured HTTP endpoint wins outright, otherwise the managed model is
//! used. There is no failover; the chosen backend's error is returned as is.

use crate::backend::{
    BackendKind, ChatBackend, HttpModelBackend, LoggingBackend, ManagedModelBackend,
    NormalizedReply,
};
use crate::config::BackendConfig;
use crate::conversation::Conversation;
use crate::error::ChatError;
use std::sync::Arc;

/// Precedence order for the gateway backends
pub const PRECEDENCE: [BackendKind; 2] = [BackendKind::Http, BackendKind::Managed];

/// Pick the backend for this configuration, if any
pub fn select_backend(config: &BackendConfig) -> Option<BackendKind> {
    PRECEDENCE.into_iter().find(|kind| match kind {
        BackendKind::Http => config.http.as_ref().is_some_and(|http| !http.url.trim().is_empty()),
        BackendKind::Managed => config.managed.is_some(),
        BackendKind::LocalPipeline => false,
    })
}

/// Routes each conversation to the configured backend
pub struct Dispatcher {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl Dispatcher {
    /// Build the real backend selected by `config`
    pub fn from_config(config: &BackendConfig) -> Result<Self, ChatError> {
        Self::with_factory(config, |kind| match kind {
            BackendKind::Http => {
                let http = config
                    .http
                    .as_ref()
                    .ok_or_else(|| ChatError::internal("HTTP backend selected without config"))?;
                Ok(Arc::new(HttpModelBackend::new(http)?) as Arc<dyn ChatBackend>)
            }
            BackendKind::Managed => {
                let managed = config
                    .managed
                    .as_ref()
                    .ok_or_else(|| ChatError::internal("Managed backend selected without config"))?;
                Ok(Arc::new(ManagedModelBackend::new(managed)) as Arc<dyn ChatBackend>)
            }
            BackendKind::LocalPipeline => Err(ChatError::internal(
                "The local pipeline is served by the predict service",
            )),
        })
    }

    /// Select by `config`, constructing only the chosen backend via `factory`
    pub fn with_factory(
        config: &BackendConfig,
        factory: impl FnOnce(BackendKind) -> Result<Arc<dyn ChatBackend>, ChatError>,
    ) -> Result<Self, ChatError> {
        let backend = match select_backend(config) {
            Some(kind) => {
                tracing::info!(backend = kind.display_name(), "Backend selected");
                let inner = factory(kind)?;
                Some(Arc::new(LoggingBackend::new(inner)) as Arc<dyn ChatBackend>)
            }
            None => {
                tracing::warn!("No backend configured. Set API_URL or AWS_BEARER_TOKEN_BEDROCK.");
                None
            }
        };
        Ok(Self { backend })
    }

    pub fn selected(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    pub async fn dispatch(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(ChatError::no_backend_configured)?;
        backend.generate(conversation).await
    }
}
