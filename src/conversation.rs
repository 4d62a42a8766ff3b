//! Conversation model
//!
//! A [`Conversation`] is the ordered dialogue fed back to the model on every
//! request. Turns are validated on construction and never change afterwards;
//! the only way to grow a conversation is [`Conversation::append`].

#[cfg(test)]
mod proptests;

use crate::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTurn")]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Build a turn, rejecting empty content
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, ChatError> {
        let content = content.into();
        if content.is_empty() {
            return Err(ChatError::malformed_request(format!(
                "{} turn content must be non-empty",
                role.as_str()
            )));
        }
        Ok(Self { role, content })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, ChatError> {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Result<Self, ChatError> {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Wire shape of a turn before validation
#[derive(Deserialize)]
struct RawTurn {
    role: Role,
    content: String,
}

impl TryFrom<RawTurn> for Turn {
    type Error = ChatError;

    fn try_from(raw: RawTurn) -> Result<Self, Self::Error> {
        Turn::new(raw.role, raw.content)
    }
}

/// Ordered sequence of turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the end; existing turns are untouched
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent user turn, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(Turn::content)
    }

    /// Flatten into a single prompt.
    ///
    /// Each turn becomes `"<role>: <content>"`, turns are joined by `\n`, and an
    /// `"assistant: "` cue is appended as the final line. The output is
    /// byte-stable for a given sequence.
    pub fn to_transcript(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            // Writing to a String cannot fail
            let _ = writeln!(out, "{}: {}", turn.role.as_str(), turn.content);
        }
        out.push_str("assistant: ");
        out
    }
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}
