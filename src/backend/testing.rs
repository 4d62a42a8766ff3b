//! Stub backends for testing
//!
//! These let the dispatcher and request handler run without real I/O.

use super::{BackendKind, ChatBackend, NormalizedReply};
use crate::conversation::Conversation;
use crate::error::ChatError;
use async_trait::async_trait;
use std::sync::Mutex;

enum StubBehavior {
    Reply(String),
    /// Reply with the last user message, prefixed
    Echo,
    Fail(ChatError),
    Panic,
}

/// Backend returning a fixed outcome and recording every conversation it saw
pub struct StubBackend {
    kind: BackendKind,
    behavior: StubBehavior,
    requests: Mutex<Vec<Conversation>>,
}

impl StubBackend {
    fn with_behavior(kind: BackendKind, behavior: StubBehavior) -> Self {
        Self {
            kind,
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(kind: BackendKind, text: impl Into<String>) -> Self {
        Self::with_behavior(kind, StubBehavior::Reply(text.into()))
    }

    pub fn echoing(kind: BackendKind) -> Self {
        Self::with_behavior(kind, StubBehavior::Echo)
    }

    pub fn failing(kind: BackendKind, error: ChatError) -> Self {
        Self::with_behavior(kind, StubBehavior::Fail(error))
    }

    pub fn panicking(kind: BackendKind) -> Self {
        Self::with_behavior(kind, StubBehavior::Panic)
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<Conversation> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn generate(&self, conversation: &Conversation) -> Result<NormalizedReply, ChatError> {
        self.requests.lock().unwrap().push(conversation.clone());
        match &self.behavior {
            StubBehavior::Reply(text) => Ok(NormalizedReply::new(text.clone())),
            StubBehavior::Echo => Ok(NormalizedReply::new(format!(
                "echo: {}",
                conversation.last_user_message().unwrap_or_default()
            ))),
            StubBehavior::Fail(err) => Err(err.clone()),
            StubBehavior::Panic => panic!("stub backend panicked"),
        }
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}
