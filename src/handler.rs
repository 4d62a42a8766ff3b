//! Request handler
//!
//! The single entry point for the transport layer. Parses and validates the
//! request, appends the user turn, dispatches, appends the assistant turn,
//! and folds every error (panics included) into a [`Outcome::Failure`].

#[cfg(test)]
mod proptests;

use crate::backend::BackendKind;
use crate::conversation::{Conversation, Turn};
use crate::dispatcher::Dispatcher;
use crate::error::{ChatError, ErrorKind};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Result of handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        reply: String,
        conversation_history: Conversation,
    },
    Failure {
        status_category: ErrorKind,
        message: String,
    },
}

impl Outcome {
    fn failure(err: ChatError) -> Self {
        Outcome::Failure {
            status_category: err.kind,
            message: err.message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// 200 for success, 500 for every failure regardless of kind
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Success { .. } => 200,
            Outcome::Failure { .. } => 500,
        }
    }

    pub fn into_body(self) -> ResponseBody {
        match self {
            Outcome::Success {
                reply,
                conversation_history,
            } => ResponseBody {
                success: true,
                response: Some(reply),
                conversation_history: Some(conversation_history),
                error: None,
            },
            Outcome::Failure { message, .. } => ResponseBody {
                success: false,
                response: None,
                conversation_history: None,
                error: Some(message),
            },
        }
    }
}

/// JSON body handed back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Conversation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Incoming chat request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody {
    message: Option<String>,
    #[serde(default)]
    conversation_history: Option<Conversation>,
}

/// Validated request
#[derive(Debug)]
struct ChatRequest {
    message: String,
    history: Conversation,
}

fn parse_request(raw: &[u8]) -> Result<ChatRequest, ChatError> {
    let body: ChatRequestBody = serde_json::from_slice(raw)
        .map_err(|e| ChatError::malformed_request(format!("Invalid request body: {e}")))?;

    let message = body
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ChatError::malformed_request("message field is required"))?;

    Ok(ChatRequest {
        message,
        history: body.conversation_history.unwrap_or_default(),
    })
}

/// Handles chat requests against one dispatcher
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Arc<Dispatcher>,
}

impl RequestHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn selected_backend(&self) -> Option<BackendKind> {
        self.dispatcher.selected()
    }

    /// Process a raw request body. Never panics and never returns an error.
    pub async fn handle(&self, raw: &[u8]) -> Outcome {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("chat_request", %request_id);

        let result = AssertUnwindSafe(self.process(raw))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        span.in_scope(|| match result {
            Ok(Ok((reply, conversation_history))) => {
                tracing::info!(turns = conversation_history.len(), "Chat request succeeded");
                Outcome::Success {
                    reply,
                    conversation_history,
                }
            }
            Ok(Err(e)) => {
                if e.kind.is_backend_side() {
                    tracing::error!(error_kind = %e.kind, error = %e.message, "Chat request failed");
                } else {
                    tracing::warn!(error_kind = %e.kind, error = %e.message, "Chat request rejected");
                }
                Outcome::failure(e)
            }
            Err(_) => {
                tracing::error!("Chat request panicked");
                Outcome::failure(ChatError::internal(
                    "Internal error while processing the request",
                ))
            }
        })
    }

    async fn process(&self, raw: &[u8]) -> Result<(String, Conversation), ChatError> {
        let request = parse_request(raw)?;
        tracing::debug!(
            message = %request.message,
            history_turns = request.history.len(),
            "Received chat request"
        );

        let mut conversation = request.history;
        conversation.append(Turn::user(request.message)?);

        let reply = self.dispatcher.dispatch(&conversation).await?;
        let assistant = Turn::assistant(reply.text.as_str())
            .map_err(|_| ChatError::protocol("Backend returned an empty reply"))?;
        conversation.append(assistant);

        Ok((reply.text, conversation))
    }
}
