//! Chat gateway
//!
//! Accepts a user message plus prior turns, forwards the conversation to one
//! configured model backend, and returns the reply with the updated history.

pub mod api;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logging;

pub use conversation::{Conversation, Role, Turn};
pub use dispatcher::Dispatcher;
pub use error::{ChatError, ErrorKind};
pub use handler::{Outcome, RequestHandler};
