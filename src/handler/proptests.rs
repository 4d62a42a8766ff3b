//! Property tests for the request handler
//!
//! - A successful exchange appends exactly `{user, M}` then `{assistant, reply}`
//! - Prior turns come back unchanged and in order
//! - Requests without a usable message never reach the backend

use super::tests::handler_with;
use super::Outcome;
use crate::backend::testing::StubBackend;
use crate::backend::BackendKind;
use crate::conversation::Role;
use crate::error::ErrorKind;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn arb_role() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("user"), Just("assistant")]
}

fn arb_history() -> impl Strategy<Value = Vec<(&'static str, String)>> {
    proptest::collection::vec((arb_role(), "[a-zA-Z0-9 _.!?,]{1,40}"), 0..10)
}

fn arb_unusable_message() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("")),
        Just(Value::Null),
        any::<i64>().prop_map(|n| json!(n)),
        Just(json!([])),
    ]
}

fn history_json(history: &[(&'static str, String)]) -> Value {
    Value::Array(
        history
            .iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect(),
    )
}

proptest! {
    #[test]
    fn success_appends_exactly_two_turns(
        history in arb_history(),
        message in "[a-zA-Z0-9 _.!?,\t]{1,40}",
    ) {
        let handler = handler_with(Arc::new(StubBackend::echoing(BackendKind::Managed)));
        let raw = serde_json::to_vec(&json!({
            "message": message,
            "conversationHistory": history_json(&history),
        }))
        .unwrap();

        let outcome = block_on(handler.handle(&raw));
        let Outcome::Success { reply, conversation_history } = outcome else {
            return Err(TestCaseError::fail("expected success"));
        };

        let turns = conversation_history.turns();
        prop_assert_eq!(turns.len(), history.len() + 2);
        for (turn, (role, content)) in turns.iter().zip(&history) {
            prop_assert_eq!(turn.role().as_str(), *role);
            prop_assert_eq!(turn.content(), content.as_str());
        }
        let user = &turns[history.len()];
        let assistant = &turns[history.len() + 1];
        prop_assert_eq!(user.role(), Role::User);
        prop_assert_eq!(user.content(), message.as_str());
        prop_assert_eq!(assistant.role(), Role::Assistant);
        prop_assert_eq!(assistant.content(), reply.as_str());
        prop_assert_eq!(reply, format!("echo: {message}"));
    }

    #[test]
    fn unusable_message_never_dispatches(
        history in arb_history(),
        message in arb_unusable_message(),
    ) {
        let stub = Arc::new(StubBackend::echoing(BackendKind::Managed));
        let handler = handler_with(stub.clone());
        let raw = serde_json::to_vec(&json!({
            "message": message,
            "conversationHistory": history_json(&history),
        }))
        .unwrap();

        let outcome = block_on(handler.handle(&raw));
        let is_malformed = matches!(
            outcome,
            Outcome::Failure { status_category: ErrorKind::MalformedRequest, .. }
        );
        prop_assert!(is_malformed);
        prop_assert_eq!(stub.call_count(), 0);
    }
}
