//! Property tests for the conversation model

use super::{Conversation, Role, Turn};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant)]
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (arb_role(), "[a-zA-Z0-9][a-zA-Z0-9 _.!?,]{0,60}")
        .prop_map(|(role, content)| Turn::new(role, content).unwrap())
}

fn arb_conversation() -> impl Strategy<Value = Conversation> {
    proptest::collection::vec(arb_turn(), 0..12).prop_map(Conversation::from)
}

proptest! {
    #[test]
    fn transcript_is_deterministic(conv in arb_conversation()) {
        prop_assert_eq!(conv.to_transcript(), conv.clone().to_transcript());
    }

    #[test]
    fn transcript_has_one_line_per_turn_plus_cue(conv in arb_conversation()) {
        let transcript = conv.to_transcript();
        let lines: Vec<&str> = transcript.split('\n').collect();
        prop_assert_eq!(lines.len(), conv.len() + 1);
        prop_assert_eq!(*lines.last().unwrap(), "assistant: ");
        for (line, turn) in lines.iter().zip(conv.turns()) {
            let expected = format!("{}: {}", turn.role().as_str(), turn.content());
            prop_assert_eq!(*line, expected.as_str());
        }
    }

    #[test]
    fn append_keeps_prefix(conv in arb_conversation(), extra in arb_turn()) {
        let before = conv.clone();
        let mut after = conv;
        after.append(extra.clone());
        prop_assert_eq!(after.len(), before.len() + 1);
        prop_assert_eq!(&after.turns()[..before.len()], before.turns());
        prop_assert_eq!(after.turns().last().unwrap(), &extra);
    }

    #[test]
    fn json_round_trip_preserves_order(conv in arb_conversation()) {
        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, conv);
    }
}
